/// Format a yen amount with thousands separators: ¥1,234,000
pub fn yen(val: u64) -> String {
    format!("¥{}", grouped(val))
}

pub fn grouped(val: u64) -> String {
    let digits = val.to_string();
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yen_formatting() {
        assert_eq!(yen(0), "¥0");
        assert_eq!(yen(999), "¥999");
        assert_eq!(yen(1000), "¥1,000");
        assert_eq!(yen(12_345_678), "¥12,345,678");
    }

    #[test]
    fn test_grouped() {
        assert_eq!(grouped(216), "216");
        assert_eq!(grouped(1776), "1,776");
    }
}
