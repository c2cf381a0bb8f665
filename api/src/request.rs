use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::region::Region;
use crate::{READS_DATA_PATH, VARIANTS_DATA_PATH};

// the two object kinds served by the protocol, which determine the backing
// tool (samtools vs bcftools) and the set of acceptable formats
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Endpoint {
    Reads,
    Variants,
}

impl Endpoint {
    pub fn data_path(&self) -> &'static str {
        match self {
            Endpoint::Reads => READS_DATA_PATH,
            Endpoint::Variants => VARIANTS_DATA_PATH,
        }
    }

    pub fn default_format(&self) -> Format {
        match self {
            Endpoint::Reads => Format::Bam,
            Endpoint::Variants => Format::Vcf,
        }
    }

    // the formats this endpoint can actually stream
    pub fn supports(&self, format: Format) -> bool {
        match self {
            Endpoint::Reads => matches!(format, Format::Bam | Format::Sam),
            Endpoint::Variants => matches!(format, Format::Vcf | Format::Bcf),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "BAM")]
    Bam,
    #[serde(rename = "SAM")]
    Sam,
    #[serde(rename = "VCF")]
    Vcf,
    #[serde(rename = "BCF")]
    Bcf,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Bam => "BAM",
            Format::Sam => "SAM",
            Format::Vcf => "VCF",
            Format::Bcf => "BCF",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BAM" => Ok(Format::Bam),
            "SAM" => Ok(Format::Sam),
            "VCF" => Ok(Format::Vcf),
            "BCF" => Ok(Format::Bcf),
            other => Err(other.to_owned()),
        }
    }
}

// which slice of the response file a data descriptor yields.  only body
// blocks carry region constraints
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockClass {
    Header,
    Body,
    Footer,
}

impl BlockClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockClass::Header => "header",
            BlockClass::Body => "body",
            BlockClass::Footer => "footer",
        }
    }
}

impl FromStr for BlockClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(BlockClass::Header),
            "body" => Ok(BlockClass::Body),
            "footer" => Ok(BlockClass::Footer),
            other => Err(other.to_owned()),
        }
    }
}

// body of a POST ticket request, which is how clients ask for more than one
// region at a time
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TicketRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<Region>>,
}
