//! 通用工具函数

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// 生成患者登记编号
pub fn generate_patient_id(at: DateTime<Utc>) -> String {
    format!("LS-{}", at.format("%Y%m%d%H%M%S"))
}

/// 按参考日期计算年龄，出生日期无法解析或晚于参考日期时返回 None
pub fn calculate_age(date_of_birth: &str, on: NaiveDate) -> Option<u32> {
    let birth = NaiveDate::parse_from_str(date_of_birth.trim(), "%Y-%m-%d").ok()?;
    if birth > on {
        return None;
    }

    let mut age = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

/// 年龄展示文本
pub fn describe_age(date_of_birth: &str, on: NaiveDate) -> String {
    match calculate_age(date_of_birth, on) {
        Some(age) => format!("{} years", age),
        None => "Unknown".to_string(),
    }
}

/// 置信度百分比，保留一位小数
pub fn format_confidence(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_patient_id() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(generate_patient_id(at), "LS-20260102030405");
    }

    #[test]
    fn test_calculate_age() {
        let on = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        assert_eq!(calculate_age("1990-06-15", on), Some(36));
        assert_eq!(calculate_age("1990-06-16", on), Some(35));
        assert_eq!(calculate_age("not a date", on), None);
        assert_eq!(calculate_age("2030-01-01", on), None);
        assert_eq!(describe_age("", on), "Unknown");
    }

    #[test]
    fn test_format_confidence() {
        assert_eq!(format_confidence(0.91), "91.0%");
        assert_eq!(format_confidence(0.88), "88.0%");
    }
}
