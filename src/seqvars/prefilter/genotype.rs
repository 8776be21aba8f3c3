//! Parsing of the per-sample genotype column.

use crate::err::GenotypeError;

/// Keys of a call with phasing information.
pub const PHASED_KEYS: &[&str] = &["GT", "AD", "DP", "GQ", "PGT", "PID", "PL", "SB"];
/// Keys of a call without phasing information.
pub const UNPHASED_KEYS: &[&str] = &["GT", "AD", "DP", "GQ", "PL", "SB"];

/// Genotype fields of one sample; `PGT` and `PID` are optional.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SampleFields {
    pub gt: Option<String>,
    pub ad: Option<String>,
    pub dp: Option<String>,
    pub gq: Option<String>,
    pub pgt: Option<String>,
    pub pid: Option<String>,
    pub pl: Option<String>,
    pub sb: Option<String>,
}

impl SampleFields {
    /// Parse the colon-separated sample `value`.
    ///
    /// With `format`, values are assigned to the FORMAT keys; trailing values may
    /// be absent.  Without `format`, the value count selects between
    /// [`PHASED_KEYS`] and [`UNPHASED_KEYS`].  Values `"."` and `""` are missing.
    pub fn parse(value: &str, format: Option<&str>) -> Result<Self, GenotypeError> {
        let values = value.split(':').collect::<Vec<_>>();
        let keys: Vec<&str> = match format {
            Some(format) => {
                let keys = format.split(':').collect::<Vec<_>>();
                if values.len() > keys.len() {
                    return Err(GenotypeError::FormatMismatch {
                        keys: keys.len(),
                        values: values.len(),
                    });
                }
                keys
            }
            None => match values.len() {
                8 => PHASED_KEYS.to_vec(),
                6 => UNPHASED_KEYS.to_vec(),
                n => return Err(GenotypeError::UnexpectedArity(n)),
            },
        };

        let mut result = SampleFields::default();
        for (key, value) in keys.iter().zip(values.iter()) {
            let value = match *value {
                "" | "." => None,
                value => Some(value.to_string()),
            };
            match *key {
                "GT" => result.gt = value,
                "AD" => result.ad = value,
                "DP" => result.dp = value,
                "GQ" => result.gq = value,
                "PGT" => result.pgt = value,
                "PID" => result.pid = value,
                "PL" => result.pl = value,
                "SB" => result.sb = value,
                _ => (),
            }
        }
        Ok(result)
    }

    /// The `i`-th component of the comma-separated `AD` field, if present.
    pub fn allele_depth(&self, i: usize) -> Option<&str> {
        self.ad
            .as_deref()
            .and_then(|ad| ad.split(',').nth(i))
            .filter(|s| !s.is_empty() && *s != ".")
    }

    /// Number of comma-separated `AD` components.
    pub fn allele_depth_count(&self) -> usize {
        self.ad.as_deref().map(|ad| ad.split(',').count()).unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::SampleFields;
    use crate::err::GenotypeError;

    #[test]
    fn parse_phased_without_format() -> Result<(), anyhow::Error> {
        let fields = SampleFields::parse("0/1:5,3,0:8:99:0|1:1234_A_G:80,0,120:2,3,1,2", None)?;

        assert_eq!(
            fields,
            SampleFields {
                gt: Some("0/1".into()),
                ad: Some("5,3,0".into()),
                dp: Some("8".into()),
                gq: Some("99".into()),
                pgt: Some("0|1".into()),
                pid: Some("1234_A_G".into()),
                pl: Some("80,0,120".into()),
                sb: Some("2,3,1,2".into()),
            }
        );

        Ok(())
    }

    #[test]
    fn parse_unphased_without_format() -> Result<(), anyhow::Error> {
        let fields = SampleFields::parse("0/1:5,3,0:8:99:80,0,120:2,3,1,2", None)?;

        assert_eq!(fields.pgt, None);
        assert_eq!(fields.pid, None);
        assert_eq!(fields.pl.as_deref(), Some("80,0,120"));
        assert_eq!(fields.sb.as_deref(), Some("2,3,1,2"));

        Ok(())
    }

    #[rstest::rstest]
    #[case("0/1:5,3:8", 3)]
    #[case("0/1:5,3:8:99:0|1:x:80,0,120", 7)]
    fn unexpected_arity(#[case] value: &str, #[case] arity: usize) {
        assert_eq!(
            SampleFields::parse(value, None),
            Err(GenotypeError::UnexpectedArity(arity))
        );
    }

    #[test]
    fn parse_with_format() -> Result<(), anyhow::Error> {
        let fields = SampleFields::parse("0/1:5,3:8:99:.:80,0,120:7", Some("GT:AD:DP:GQ:PGT:PL:PS"))?;

        assert_eq!(fields.dp.as_deref(), Some("8"));
        assert_eq!(fields.pgt, None);
        assert_eq!(fields.pl.as_deref(), Some("80,0,120"));
        assert_eq!(fields.sb, None);

        Ok(())
    }

    #[test]
    fn parse_with_format_trailing_values_absent() -> Result<(), anyhow::Error> {
        let fields = SampleFields::parse("0/0:10", Some("GT:AD:DP:GQ:PL:SB"))?;

        assert_eq!(fields.ad.as_deref(), Some("10"));
        assert_eq!(fields.dp, None);

        Ok(())
    }

    #[test]
    fn too_many_values_for_format() {
        assert_eq!(
            SampleFields::parse("0/1:5,3:8", Some("GT:AD")),
            Err(GenotypeError::FormatMismatch { keys: 2, values: 3 })
        );
    }

    #[test]
    fn allele_depth() -> Result<(), anyhow::Error> {
        let fields = SampleFields::parse("0/1:5,,1:8:99:80,0,120:2,3,1,2", None)?;

        assert_eq!(fields.allele_depth(0), Some("5"));
        assert_eq!(fields.allele_depth(1), None);
        assert_eq!(fields.allele_depth(2), Some("1"));
        assert_eq!(fields.allele_depth(3), None);
        assert_eq!(fields.allele_depth_count(), 3);

        Ok(())
    }
}
