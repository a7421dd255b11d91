use super::*;
use chrono::NaiveDate;

fn ts() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(14, 5, 0)
        .unwrap()
}

#[test]
fn test_integer_conversions() {
    assert_eq!(i64::from_sql_value(SqlValue::Integer(101)).unwrap(), 101);
    assert_eq!(i32::from_sql_value(SqlValue::Integer(-7)).unwrap(), -7);
    assert_eq!(u32::from_sql_value(SqlValue::Integer(7)).unwrap(), 7);
}

#[test]
fn test_integer_out_of_range() {
    let result = i32::from_sql_value(SqlValue::Integer(i64::MAX));
    assert!(matches!(result, Err(DbError::TypeMismatch { .. })));
    assert!(u32::from_sql_value(SqlValue::Integer(-1)).is_err());
}

#[test]
fn test_null_is_not_an_integer() {
    let err = i64::from_sql_value(SqlValue::Null).unwrap_err();
    assert!(err.to_string().contains("expected INTEGER"));
    assert!(err.to_string().contains("NULL"));
}

#[test]
fn test_option_accepts_null() {
    assert_eq!(Option::<i64>::from_sql_value(SqlValue::Null).unwrap(), None);
    assert_eq!(
        Option::<i64>::from_sql_value(SqlValue::Integer(3)).unwrap(),
        Some(3)
    );
}

#[test]
fn test_string_accepts_text_and_integer() {
    assert_eq!(
        String::from_sql_value(SqlValue::Text("v2".into())).unwrap(),
        "v2"
    );
    assert_eq!(String::from_sql_value(SqlValue::Integer(12)).unwrap(), "12");
    assert!(String::from_sql_value(SqlValue::Boolean(true)).is_err());
}

#[test]
fn test_timestamp_round_trip_through_value() {
    let value = SqlValue::from(ts());
    assert_eq!(NaiveDateTime::from_sql_value(value).unwrap(), ts());
}

#[test]
fn test_display() {
    assert_eq!(SqlValue::Null.to_string(), "NULL");
    assert_eq!(SqlValue::from(101).to_string(), "101");
    assert_eq!(SqlValue::from("abc").to_string(), "abc");
    assert_eq!(SqlValue::from(ts()).to_string(), "2024-03-09 14:05:00");
}

#[test]
fn test_from_option() {
    assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
    assert_eq!(SqlValue::from(Some(5_i64)), SqlValue::Integer(5));
}
