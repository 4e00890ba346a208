use std::{fmt::Display, ops::RangeInclusive, str::FromStr};

use crate::config::UploadFields;

pub fn parse_range_inclusive<N: PartialEq + PartialOrd + FromStr + Display>(
    s: &str,
    range: RangeInclusive<N>,
) -> Result<N, String> {
    let value: N = s.parse().map_err(|_| "invalid numeric value")?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} is not in range {}-{}",
            value,
            range.start(),
            range.end(),
        ))
    }
}

pub fn parse_upload_fields(s: &str) -> Result<UploadFields, String> {
    s.parse().map_err(|err| format!("{err}"))
}

#[cfg(test)]
mod tests {
    use super::{parse_range_inclusive, parse_upload_fields};

    #[test]
    fn range_accepts_bounds() {
        assert_eq!(parse_range_inclusive("1", 1..=1024), Ok(1usize));
        assert_eq!(parse_range_inclusive("1024", 1..=1024), Ok(1024usize));
    }

    #[test]
    fn range_rejects_outside_values() {
        assert_eq!(
            parse_range_inclusive("0", 1..=1024usize),
            Err("0 is not in range 1-1024".to_owned())
        );
        assert!(parse_range_inclusive("ten", 1..=1024usize).is_err());
        assert!(parse_range_inclusive("-1", 1..=1024usize).is_err());
    }

    #[test]
    fn upload_fields_are_parsed() {
        let fields = parse_upload_fields("album=trip,owner=me").unwrap();
        let pairs: Vec<_> = fields.iter().collect();
        assert_eq!(pairs, vec![("album", "trip"), ("owner", "me")]);
        assert!(parse_upload_fields("album").is_err());
    }
}
