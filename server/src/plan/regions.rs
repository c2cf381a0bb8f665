use std::collections::HashMap;

use anyhow::Result;
use tracing::{debug, instrument, warn};

use api::region::Region;
use api::request::{Endpoint, Format};

use crate::cli::bcftools::BcftoolsView;
use crate::cli::samtools::SamtoolsView;
use crate::cli::{head, CommandChain};

// how many alignments the read-length probe inspects
const READ_LENGTH_PROBE_LINES: u32 = 100;

// zero-based index of the SEQ column in a sam line
const SEQ_FIELD_INDEX: usize = 9;

// the sort -> merge -> bridge pipeline: puts requested regions into the
// file's native reference order, collapses overlaps, and groups regions
// close enough to extract with a single tool invocation.  each returned
// group becomes one body block in the ticket
#[instrument(skip(regions))]
pub async fn preprocess_regions(
    endpoint: Endpoint,
    path: &str,
    regions: Vec<Region>,
) -> Vec<Vec<Region>> {
    let regions = sort_regions(endpoint, path, regions).await;
    let regions = merge_regions(regions);

    let bridge = bridge_length(endpoint, path).await;
    debug!(bridge, "grouping regions");

    group_regions(regions, bridge)
}

async fn sort_regions(endpoint: Endpoint, path: &str, mut regions: Vec<Region>) -> Vec<Region> {
    match reference_names(endpoint, path).await {
        Ok(names) => {
            let ranks: HashMap<String, usize> = names
                .into_iter()
                .enumerate()
                .map(|(rank, name)| (name, rank))
                .collect();

            sort_with_ranks(&mut regions, &ranks);
        }
        Err(err) => {
            // sorting degrades to request order, which risks the tools
            // rejecting an out-of-order region list but is not itself fatal
            warn!("failed to probe reference order for {path}: {err:#}");
        }
    }

    regions
}

// sort by (reference rank, start, end); unknown references rank after every
// known one.  sort_by_key is stable, so equal keys keep their request order
pub(crate) fn sort_with_ranks(regions: &mut [Region], ranks: &HashMap<String, usize>) {
    let unknown = ranks.len();

    regions.sort_by_key(|region| {
        (
            ranks.get(&region.reference_name).copied().unwrap_or(unknown),
            region.effective_start(),
            region.effective_end(),
        )
    });
}

// containment-based merging: since the list is sorted, two neighbors merge
// exactly when the second one starts inside the first.  the cursor stays put
// after a merge so the widened region can absorb further neighbors.  regions
// that are close but disjoint are left alone; the bridge step decides
// whether they share a tool invocation
pub(crate) fn merge_regions(mut regions: Vec<Region>) -> Vec<Region> {
    let mut i = 0;

    while i + 1 < regions.len() {
        let current = &regions[i];
        let next = &regions[i + 1];

        let contained = current.reference_name == next.reference_name
            && next.effective_start() >= current.effective_start()
            && next.effective_start() <= current.effective_end();

        if contained {
            let start = match (current.start, next.start) {
                (Some(a), Some(b)) => Some(a.min(b)),
                _ => None,
            };
            let end = match (current.end, next.end) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            };

            regions[i] = Region::new(current.reference_name.clone(), start, end);
            regions.remove(i + 1);
        } else {
            i += 1;
        }
    }

    regions
}

// consecutive same-reference regions closer than the bridge length share a
// group.  the first region always opens a group and the last group is
// always flushed
pub(crate) fn group_regions(regions: Vec<Region>, bridge_length: i64) -> Vec<Vec<Region>> {
    let mut groups = Vec::new();

    let mut iter = regions.into_iter();
    let Some(first) = iter.next() else {
        return groups;
    };

    let mut group = vec![first];
    for next in iter {
        let current = group.last().unwrap();

        let bridged = current.reference_name == next.reference_name
            && next.effective_start().saturating_sub(current.effective_end()) < bridge_length;

        if bridged {
            group.push(next);
        } else {
            groups.push(std::mem::replace(&mut group, vec![next]));
        }
    }
    groups.push(group);

    groups
}

// reads bridge by an estimate of read length, so that two regions closer
// than one read are extracted together and reads straddling the gap are not
// lost.  variants are pointwise and never bridge
async fn bridge_length(endpoint: Endpoint, path: &str) -> i64 {
    match endpoint {
        Endpoint::Variants => 0,
        Endpoint::Reads => match min_read_length(path).await {
            Ok(length) => length,
            Err(err) => {
                warn!("failed to probe read length for {path}: {err:#}");
                0
            }
        },
    }
}

// minimum SEQ length over the first few alignments, a conservative proxy
// for read length
#[instrument]
async fn min_read_length(path: &str) -> Result<i64> {
    let chain = CommandChain::new()
        .add(SamtoolsView::new(path).build())
        .add(head(READ_LENGTH_PROBE_LINES));

    let output = chain.execute()?.collect_stdout().await?;

    Ok(min_seq_length(&String::from_utf8_lossy(&output)))
}

pub(crate) fn min_seq_length(alignments: &str) -> i64 {
    alignments
        .lines()
        .filter_map(|line| line.split('\t').nth(SEQ_FIELD_INDEX))
        .map(|seq| seq.len() as i64)
        .min()
        .unwrap_or(0)
}

// the reference ordering native to the object, probed from its header
async fn reference_names(endpoint: Endpoint, path: &str) -> Result<Vec<String>> {
    match endpoint {
        Endpoint::Reads => {
            let chain =
                CommandChain::new().add(SamtoolsView::new(path).header_only(true).build());
            let output = chain.execute()?.collect_stdout().await?;

            Ok(parse_sq_names(&String::from_utf8_lossy(&output)))
        }
        Endpoint::Variants => {
            let chain = CommandChain::new().add(
                BcftoolsView::new(path)
                    .header_only(true)
                    .output_format(Format::Vcf)
                    .build(),
            );
            let output = chain.execute()?.collect_stdout().await?;

            Ok(parse_contig_names(&String::from_utf8_lossy(&output)))
        }
    }
}

// @SQ lines in declaration order, e.g. "@SQ\tSN:chr1\tLN:248956422"
pub(crate) fn parse_sq_names(header: &str) -> Vec<String> {
    header
        .lines()
        .filter(|line| line.starts_with("@SQ"))
        .filter_map(|line| {
            line.split('\t')
                .find_map(|field| field.strip_prefix("SN:"))
        })
        .map(str::to_owned)
        .collect()
}

// ##contig declarations in order, e.g. "##contig=<ID=chr1,length=248956422>"
pub(crate) fn parse_contig_names(header: &str) -> Vec<String> {
    header
        .lines()
        .filter_map(|line| line.strip_prefix("##contig=<"))
        .filter_map(|body| {
            body.trim_end_matches('>')
                .split(',')
                .find_map(|field| field.strip_prefix("ID="))
        })
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(names: &[&str]) -> HashMap<String, usize> {
        names
            .iter()
            .enumerate()
            .map(|(rank, name)| ((*name).to_owned(), rank))
            .collect()
    }

    fn region(reference_name: &str, start: i64, end: i64) -> Region {
        Region::new(reference_name, Some(start), Some(end))
    }

    #[test]
    fn sort_merge_bridge_pipeline() {
        // header lists chr1 then chr2; estimated read length 100
        let mut regions = vec![
            region("chr1", 10, 20),
            region("chr1", 15, 30),
            region("chr2", 5, 10),
        ];

        sort_with_ranks(&mut regions, &ranks(&["chr1", "chr2"]));
        let merged = merge_regions(regions);

        assert_eq!(merged, vec![region("chr1", 10, 30), region("chr2", 5, 10)]);

        let groups = group_regions(merged, 100);

        assert_eq!(
            groups,
            vec![vec![region("chr1", 10, 30)], vec![region("chr2", 5, 10)]]
        );
    }

    #[test]
    fn close_regions_bridge_for_reads_but_not_variants() {
        let regions = vec![region("chr1", 100, 200), region("chr1", 250, 300)];

        // gap of 50 < read length of 100: a single tool invocation
        let reads_groups = group_regions(regions.clone(), 100);
        assert_eq!(
            reads_groups,
            vec![vec![region("chr1", 100, 200), region("chr1", 250, 300)]]
        );

        // variants never bridge
        let variants_groups = group_regions(regions, 0);
        assert_eq!(
            variants_groups,
            vec![
                vec![region("chr1", 100, 200)],
                vec![region("chr1", 250, 300)]
            ]
        );
    }

    #[test]
    fn sort_ranks_by_header_order() {
        let mut regions = vec![
            region("chr2", 5, 10),
            region("chr10", 1, 2),
            region("chr1", 100, 200),
            region("chr1", 10, 20),
        ];

        // the header declares chr10 before chr1 and chr2
        sort_with_ranks(&mut regions, &ranks(&["chr10", "chr1", "chr2"]));

        assert_eq!(
            regions,
            vec![
                region("chr10", 1, 2),
                region("chr1", 10, 20),
                region("chr1", 100, 200),
                region("chr2", 5, 10),
            ]
        );
    }

    #[test]
    fn unknown_references_sort_after_known_ones() {
        let mut regions = vec![
            region("chrUn_gl000220", 1, 10),
            region("chr2", 5, 10),
            region("chr1", 1, 5),
        ];

        sort_with_ranks(&mut regions, &ranks(&["chr1", "chr2"]));

        assert_eq!(
            regions,
            vec![
                region("chr1", 1, 5),
                region("chr2", 5, 10),
                region("chrUn_gl000220", 1, 10),
            ]
        );
    }

    #[test]
    fn sort_is_stable_under_equal_keys() {
        // identical coordinates on two unknown references: request order holds
        let mut regions = vec![region("ctgB", 1, 10), region("ctgA", 1, 10)];

        sort_with_ranks(&mut regions, &ranks(&[]));

        assert_eq!(regions, vec![region("ctgB", 1, 10), region("ctgA", 1, 10)]);
    }

    #[test]
    fn merge_absorbs_chains_of_overlaps() {
        let merged = merge_regions(vec![
            region("chr1", 10, 20),
            region("chr1", 15, 30),
            region("chr1", 25, 40),
        ]);

        assert_eq!(merged, vec![region("chr1", 10, 40)]);
    }

    #[test]
    fn merge_keeps_disjoint_regions() {
        let regions = vec![region("chr1", 10, 20), region("chr1", 21, 30)];

        assert_eq!(merge_regions(regions.clone()), regions);
    }

    #[test]
    fn merge_never_crosses_references() {
        let regions = vec![region("chr1", 10, 20), region("chr2", 15, 30)];

        assert_eq!(merge_regions(regions.clone()), regions);
    }

    #[test]
    fn merge_is_idempotent() {
        let cases = vec![
            vec![],
            vec![region("chr1", 10, 20)],
            vec![region("chr1", 10, 20), region("chr1", 15, 30)],
            vec![
                region("chr1", 10, 20),
                region("chr1", 20, 30),
                region("chr1", 100, 200),
                region("chr2", 1, 1),
            ],
        ];

        for regions in cases {
            let once = merge_regions(regions);
            let twice = merge_regions(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn merge_handles_open_ended_regions() {
        // a region with no end reaches the end of the contig, so anything
        // after it on the same reference is contained
        let merged = merge_regions(vec![
            Region::new("chr1", Some(10), None),
            region("chr1", 500, 600),
        ]);

        assert_eq!(merged, vec![Region::new("chr1", Some(10), None)]);
    }

    #[test]
    fn bridge_monotonicity() {
        let regions = vec![
            region("chr1", 0, 10),
            region("chr1", 50, 60),
            region("chr1", 500, 600),
            region("chr2", 0, 10),
        ];

        let mut previous = usize::MAX;
        for bridge in [0, 10, 50, 100, 1000, 10_000] {
            let count = group_regions(regions.clone(), bridge).len();
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn grouping_empty_input() {
        assert!(group_regions(vec![], 100).is_empty());
    }

    #[test]
    fn sq_name_parsing() {
        let header = "@HD\tVN:1.6\tSO:coordinate\n\
                      @SQ\tSN:chr1\tLN:248956422\n\
                      @SQ\tSN:chr2\tLN:242193529\n\
                      @PG\tID:bwa\tPN:bwa\n";

        assert_eq!(parse_sq_names(header), ["chr1", "chr2"]);
    }

    #[test]
    fn contig_name_parsing() {
        let header = "##fileformat=VCFv4.2\n\
                      ##contig=<ID=20,length=63025520>\n\
                      ##contig=<ID=21,length=48129895>\n\
                      #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

        assert_eq!(parse_contig_names(header), ["20", "21"]);
    }

    #[test]
    fn min_seq_length_takes_the_shortest() {
        let alignments = "r1\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tFFFF\n\
                          r2\t0\tchr1\t200\t60\t2M\t*\t0\t0\tAC\tFF\n\
                          r3\t0\tchr1\t300\t60\t6M\t*\t0\t0\tACGTAC\tFFFFFF\n";

        assert_eq!(min_seq_length(alignments), 2);
    }

    #[test]
    fn min_seq_length_of_nothing_is_zero() {
        assert_eq!(min_seq_length(""), 0);
    }
}
