use rhai::Dynamic;

/// Format a Dynamic value as cell text.
pub fn format_dynamic(value: &Dynamic) -> String {
    if value.is_unit() {
        String::new()
    } else if let Ok(n) = value.as_float() {
        format_number(n)
    } else if let Ok(n) = value.as_int() {
        n.to_string()
    } else if let Ok(b) = value.as_bool() {
        if b { "TRUE" } else { "FALSE" }.to_string()
    } else if value.is_array() {
        let items = value.clone().into_array().unwrap_or_default();
        items.iter().map(format_dynamic).collect::<Vec<_>>().join(", ")
    } else if let Ok(s) = value.clone().into_string() {
        s
    } else {
        value.to_string()
    }
}

/// Format a number as cell text. Integral values print without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_dynamic() {
        assert_eq!(format_dynamic(&Dynamic::UNIT), "");
        assert_eq!(format_dynamic(&Dynamic::from(2.0_f64)), "2");
        assert_eq!(format_dynamic(&Dynamic::from(9.99_f64)), "9.99");
        assert_eq!(format_dynamic(&Dynamic::from(true)), "TRUE");
        assert_eq!(format_dynamic(&Dynamic::from("hi")), "hi");
        let list: rhai::Array = vec![Dynamic::from(1_i64), Dynamic::from("b")];
        assert_eq!(format_dynamic(&Dynamic::from(list)), "1, b");
    }

    #[test]
    fn test_format_number_special_values() {
        assert_eq!(format_number(f64::NAN), "#NAN!");
        assert_eq!(format_number(f64::INFINITY), "#INF!");
        assert_eq!(format_number(-3.0), "-3");
    }
}
