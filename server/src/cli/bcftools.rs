use api::region::Region;
use api::request::Format;

use crate::cli::Command;

// typed builder for 'bcftools view', which streams VCF or BCF to stdout
//
// unlike samtools, only a single -r region is passed per invocation; the
// region planner has already widened bridged groups into one interval
#[derive(Clone, Debug, Default)]
pub struct BcftoolsView {
    file_path: String,
    header_only: bool,
    output_vcf: bool,
    region: Option<Region>,
}

impl BcftoolsView {
    pub fn new(file_path: impl Into<String>) -> Self {
        BcftoolsView {
            file_path: file_path.into(),
            output_vcf: true,
            ..BcftoolsView::default()
        }
    }

    // if set, stream only the header; if unset, the header is excluded
    // entirely from VCF text output
    pub fn header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    pub fn output_vcf(mut self, output_vcf: bool) -> Self {
        self.output_vcf = output_vcf;
        self
    }

    // anything other than BCF falls back to VCF text
    pub fn output_format(self, format: Format) -> Self {
        match format {
            Format::Bcf => self.output_vcf(false),
            _ => self.output_vcf(true),
        }
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn build(self) -> Command {
        let mut command = Command::new("bcftools")
            .arg("view")
            .arg(self.file_path)
            .arg("--no-version");

        if self.header_only {
            command = command.arg("-h");
        } else if self.output_vcf {
            command = command.arg("-H");
        }

        // -O v is uncompressed VCF text, -O u is uncompressed BCF
        command = command.arg("-O").arg(if self.output_vcf { "v" } else { "u" });

        if let Some(region) = &self.region {
            command = command.arg("-r").arg(region.export_bcftools());
        }

        command
    }
}
