use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// a genomic interval: contig name plus optional start and end positions
//
// a missing start means "from position 0", and a missing end means "through
// the end of the contig".  when both are present, 0 <= start <= end
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub reference_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("failed to parse region from string: {0}")]
pub struct RegionParseError(pub String);

impl Region {
    pub fn new(reference_name: impl Into<String>, start: Option<i64>, end: Option<i64>) -> Self {
        Region {
            reference_name: reference_name.into(),
            start,
            end,
        }
    }

    // coordinates used when comparing regions, with the missing-bound
    // conventions made explicit
    pub fn effective_start(&self) -> i64 {
        self.start.unwrap_or(0)
    }

    pub fn effective_end(&self) -> i64 {
        self.end.unwrap_or(i64::MAX)
    }

    // interval syntax accepted by samtools: ref, ref:start, ref:0-end, or
    // ref:start-end
    pub fn export_samtools(&self) -> String {
        match (self.start, self.end) {
            (None, None) => self.reference_name.clone(),
            (Some(start), None) => format!("{}:{}", self.reference_name, start),
            (None, Some(end)) => format!("{}:0-{}", self.reference_name, end),
            (Some(start), Some(end)) => format!("{}:{}-{}", self.reference_name, start, end),
        }
    }

    // bcftools differs from samtools only when just the start is set, where
    // the trailing dash is required to mean "through the end of the contig"
    pub fn export_bcftools(&self) -> String {
        match (self.start, self.end) {
            (Some(start), None) => format!("{}:{}-", self.reference_name, start),
            _ => self.export_samtools(),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.export_samtools())
    }
}

impl FromStr for Region {
    type Err = RegionParseError;

    // parses the ref[:start[-end]] form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut colon_split = s.splitn(2, ':');

        let reference_name = colon_split.next().unwrap_or_default().to_owned();

        let (start, end) = match colon_split.next() {
            None => (None, None),
            Some(interval) => {
                let mut dash_split = interval.splitn(2, '-');

                let start = dash_split
                    .next()
                    .unwrap_or_default()
                    .parse::<i64>()
                    .map_err(|_| RegionParseError(s.to_owned()))?;

                let end = dash_split
                    .next()
                    .map(|end| end.parse::<i64>().map_err(|_| RegionParseError(s.to_owned())))
                    .transpose()?;

                (Some(start), end)
            }
        };

        Ok(Region {
            reference_name,
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fully_bounded() {
        let region = Region::from_str("chr3:100-200").unwrap();

        assert_eq!(region, Region::new("chr3", Some(100), Some(200)));
        assert_eq!(region.export_samtools(), "chr3:100-200");
        assert_eq!(region.export_bcftools(), "chr3:100-200");
    }

    #[test]
    fn parse_start_only() {
        let region = Region::from_str("chrX:500").unwrap();

        assert_eq!(region, Region::new("chrX", Some(500), None));
        assert_eq!(region.export_samtools(), "chrX:500");
        assert_eq!(region.export_bcftools(), "chrX:500-");
    }

    #[test]
    fn parse_reference_only() {
        let region = Region::from_str("chr1").unwrap();

        assert_eq!(region, Region::new("chr1", None, None));
        assert_eq!(region.export_samtools(), "chr1");
        assert_eq!(region.export_bcftools(), "chr1");
    }

    #[test]
    fn end_only_exports() {
        let region = Region::new("chr2", None, Some(700));

        assert_eq!(region.export_samtools(), "chr2:0-700");
        assert_eq!(region.export_bcftools(), "chr2:0-700");
    }

    #[test]
    fn parse_rejects_non_integer_bounds() {
        assert!(Region::from_str("chr1:abc").is_err());
        assert!(Region::from_str("chr1:100-def").is_err());
        assert!(Region::from_str("chr1:").is_err());
        assert!(Region::from_str("chr1:100-").is_err());
    }

    #[test]
    fn string_round_trip() {
        let regions = [
            Region::new("chr1", Some(0), Some(100)),
            Region::new("chrX", Some(12345), Some(67890)),
            Region::new("11", Some(1), Some(1)),
        ];

        for region in regions {
            assert_eq!(Region::from_str(&region.to_string()).unwrap(), region);
        }
    }

    #[test]
    fn serde_shape() {
        let region = Region::new("chr1", Some(10), None);
        let json = serde_json::to_value(&region).unwrap();

        assert_eq!(json, serde_json::json!({"referenceName": "chr1", "start": 10}));

        let parsed: Region =
            serde_json::from_value(serde_json::json!({"referenceName": "chr2", "end": 50}))
                .unwrap();
        assert_eq!(parsed, Region::new("chr2", None, Some(50)));
    }
}
