use std::fmt;

use log::warn;

/// 一筆被修正的設定值
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub original: f64,
    pub corrected: f64,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.field, self.original, self.corrected)
    }
}

impl ValidationIssue {
    /// 在欄位名稱前加上所屬路徑
    pub fn within(mut self, scope: &str) -> Self {
        self.field = format!("{}.{}", scope, self.field);
        self
    }
}

/// 就地修正非法設定值，回傳所有被修正的欄位
pub trait Validate {
    fn validate(&mut self) -> Vec<ValidationIssue>;
}

/// 夾住浮點欄位；NaN 以 fallback 取代
pub fn clamp_field(
    field: &str,
    value: &mut f32,
    min: f32,
    max: f32,
    fallback: f32,
) -> Option<ValidationIssue> {
    let original = *value;
    let corrected = if original.is_nan() {
        fallback
    } else {
        original.clamp(min, max)
    };
    if corrected.to_bits() == original.to_bits() {
        return None;
    }
    *value = corrected;
    Some(ValidationIssue {
        field: field.to_string(),
        original: original as f64,
        corrected: corrected as f64,
    })
}

pub fn clamp_count(field: &str, value: &mut u32, min: u32) -> Option<ValidationIssue> {
    if *value >= min {
        return None;
    }
    let original = *value;
    *value = min;
    Some(ValidationIssue {
        field: field.to_string(),
        original: original as f64,
        corrected: min as f64,
    })
}

pub fn log_issues(owner: &str, issues: &[ValidationIssue]) {
    for issue in issues {
        warn!("{} 設定值不合法，已修正 {}", owner, issue);
    }
}
