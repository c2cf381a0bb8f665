use api::region::Region;

use crate::cli::Command;

// typed builder for 'samtools view', which streams SAM or BAM to stdout
//
// region arguments are positional and may be repeated; samtools emits the
// union of all requested intervals in file order
#[derive(Clone, Debug, Default)]
pub struct SamtoolsView {
    file_path: String,
    header_only: bool,
    output_bam: bool,
    count: bool,
    regions: Vec<Region>,
}

impl SamtoolsView {
    pub fn new(file_path: impl Into<String>) -> Self {
        SamtoolsView {
            file_path: file_path.into(),
            ..SamtoolsView::default()
        }
    }

    // if set, stream only the header; otherwise the header is excluded from
    // SAM text output (and embedded in BAM output)
    pub fn header_only(mut self, header_only: bool) -> Self {
        self.header_only = header_only;
        self
    }

    pub fn output_bam(mut self, output_bam: bool) -> Self {
        self.output_bam = output_bam;
        self
    }

    pub fn count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    pub fn regions(mut self, regions: impl IntoIterator<Item = Region>) -> Self {
        self.regions.extend(regions);
        self
    }

    pub fn build(self) -> Command {
        let mut command = Command::new("samtools").arg("view").arg(self.file_path);

        if self.header_only {
            command = command.arg("-H");
        }

        if self.output_bam {
            command = command.arg("-b");
        }

        if self.count {
            command = command.arg("-c");
        }

        command.args(self.regions.iter().map(Region::export_samtools))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_view() {
        let command = SamtoolsView::new("/data/sample.bam").build();

        assert_eq!(command.base(), "samtools");
        assert_eq!(command.argv(), ["view", "/data/sample.bam"]);
    }

    #[test]
    fn header_only_bam() {
        let command = SamtoolsView::new("/data/sample.bam")
            .header_only(true)
            .output_bam(true)
            .build();

        assert_eq!(command.argv(), ["view", "/data/sample.bam", "-H", "-b"]);
    }

    #[test]
    fn body_with_regions() {
        let command = SamtoolsView::new("https://host/sample.bam")
            .output_bam(true)
            .regions([
                Region::new("chr1", Some(10), Some(30)),
                Region::new("chr2", Some(5), Some(10)),
            ])
            .build();

        assert_eq!(
            command.argv(),
            [
                "view",
                "https://host/sample.bam",
                "-b",
                "chr1:10-30",
                "chr2:5-10"
            ]
        );
    }

    #[test]
    fn count_only() {
        let command = SamtoolsView::new("/data/sample.bam").count(true).build();

        assert_eq!(command.argv(), ["view", "/data/sample.bam", "-c"]);
    }
}
