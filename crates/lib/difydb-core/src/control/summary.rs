use std::fmt;
use std::str::FromStr;

/// Language of the human-readable summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryLocale {
    #[default]
    Zh,
    En,
}

impl SummaryLocale {
    #[must_use]
    pub fn source_count(self, source: &str, count: usize) -> String {
        match self {
            Self::Zh => format!("[{source}] 找到 {count} 条记录"),
            Self::En => format!("[{source}] found {count} records"),
        }
    }

    #[must_use]
    pub fn plugin_workflows(self, count: usize, keyword: &str) -> String {
        match self {
            Self::Zh => format!("找到 {count} 个 workflow 使用了匹配 '{keyword}' 的 plugin"),
            Self::En => format!("found {count} workflows using plugins matching '{keyword}'"),
        }
    }

    #[must_use]
    pub fn llm_workflows(self, count: usize, keyword: &str) -> String {
        match self {
            Self::Zh => format!("找到 {count} 个 workflow 使用了匹配 '{keyword}' 的 LLM 模型"),
            Self::En => format!("found {count} workflows using LLM models matching '{keyword}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocale(pub String);

impl fmt::Display for UnknownLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown summary language: {} (expected zh or en)", self.0)
    }
}

impl std::error::Error for UnknownLocale {}

impl FromStr for SummaryLocale {
    type Err = UnknownLocale;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "zh" | "zh-cn" | "zh_cn" => Ok(Self::Zh),
            "en" | "en-us" | "en_us" => Ok(Self::En),
            _ => Err(UnknownLocale(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_per_locale() {
        assert_eq!(
            SummaryLocale::Zh.source_count("workflows", 2),
            "[workflows] 找到 2 条记录"
        );
        assert_eq!(
            SummaryLocale::En.source_count("workflows", 2),
            "[workflows] found 2 records"
        );
        assert_eq!(
            SummaryLocale::En.llm_workflows(1, "claude"),
            "found 1 workflows using LLM models matching 'claude'"
        );
    }

    #[test]
    fn parses_locale_names() {
        assert_eq!("EN".parse::<SummaryLocale>(), Ok(SummaryLocale::En));
        assert_eq!("zh-CN".parse::<SummaryLocale>(), Ok(SummaryLocale::Zh));
        assert!("fr".parse::<SummaryLocale>().is_err());
    }
}
