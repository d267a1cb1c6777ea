use rand::Rng;
use rand::seq::IndexedRandom;

use crate::config::{ChunkingConfig, LineRange};
use crate::data::{BlockId, Chunk, SourceFile};

/// Files with `min_file_lines` lines or fewer yield no chunks.
pub fn is_too_short(file: &SourceFile, config: &ChunkingConfig) -> bool {
    file.line_count() <= config.min_file_lines
}

/// Draw the next chunk size for `remaining` lines from `range`.
///
/// When fewer lines remain than the range minimum, everything left is taken.
/// The result is in `[1, remaining]` and never above `max_chunk_lines`.
pub fn draw_chunk_size<R: Rng + ?Sized>(
    range: &LineRange,
    remaining: usize,
    max_chunk_lines: usize,
    rng: &mut R,
) -> usize {
    if remaining < range.min_lines {
        return remaining.min(max_chunk_lines).max(1);
    }
    let low = range.min_lines.max(1);
    let high = range.max_lines.min(remaining).max(low);
    rng.random_range(low..=high).min(max_chunk_lines).max(1)
}

/// Cut a file into consecutive chunks with probability-weighted sizes.
///
/// `file_index` is the 1-based position of the file in the accepted input
/// order; chunk indices restart at 1 per file and only advance for emitted
/// chunks. Runs of blank lines that would produce an empty chunk are
/// consumed without emitting.
pub fn chunk_file<R: Rng + ?Sized>(
    file: &SourceFile,
    file_index: usize,
    config: &ChunkingConfig,
    rng: &mut R,
) -> Vec<Chunk> {
    if is_too_short(file, config) {
        return Vec::new();
    }
    let lines = file.lines();
    let file_name = file.name();
    let mut chunks = Vec::new();
    let mut chunk_index = 1;
    let mut start = 0;
    while start < lines.len() {
        let Ok(range) = config.line_ratios.choose_weighted(rng, |range| range.weight) else {
            break;
        };
        let size = draw_chunk_size(range, lines.len() - start, config.max_chunk_lines, rng);
        let chunk = Chunk {
            block_id: BlockId::new(file_index, chunk_index),
            file_name: file_name.clone(),
            start_line: start,
            lines: lines[start..start + size].to_vec(),
        };
        start += size;
        if chunk.text().is_empty() {
            continue;
        }
        chunk_index += 1;
        chunks.push(chunk);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::DeterministicRng;

    fn numbered_file(lines: usize) -> SourceFile {
        let text: String = (0..lines).map(|idx| format!("wire w{idx};\n")).collect();
        SourceFile::from_text("rtl/numbered.v", &text)
    }

    #[test]
    fn short_files_yield_nothing() {
        let file = SourceFile::from_text(
            "m.v",
            "module m;\nwire a;\nwire b;\nendmodule\n",
        );
        let mut rng = DeterministicRng::new(0);
        assert!(chunk_file(&file, 1, &ChunkingConfig::default(), &mut rng).is_empty());
        assert!(chunk_file(&numbered_file(5), 1, &ChunkingConfig::default(), &mut rng).is_empty());
    }

    #[test]
    fn chunks_cover_every_line_exactly_once() {
        let config = ChunkingConfig::default();
        for seed in 0..64 {
            let file = numbered_file(6 + (seed as usize * 37) % 400);
            let mut rng = DeterministicRng::new(seed);
            let chunks = chunk_file(&file, 3, &config, &mut rng);
            let mut next = 0;
            for chunk in &chunks {
                assert_eq!(chunk.start_line, next, "seed {seed}");
                assert!(chunk.line_count() >= 1);
                assert!(chunk.line_count() <= config.max_chunk_lines);
                next += chunk.line_count();
            }
            assert_eq!(next, file.line_count(), "seed {seed}");
        }
    }

    #[test]
    fn chunk_never_exceeds_drawn_range_or_remaining() {
        let range = LineRange::new(1.0, 11, 20);
        let mut rng = DeterministicRng::new(11);
        for remaining in 1..60 {
            for _ in 0..20 {
                let size = draw_chunk_size(&range, remaining, 100, &mut rng);
                assert!(size >= 1 && size <= remaining);
                if remaining >= range.min_lines {
                    assert!(size >= range.min_lines && size <= range.max_lines);
                } else {
                    assert_eq!(size, remaining);
                }
            }
        }
    }

    #[test]
    fn zero_minimum_never_draws_empty_chunks() {
        let range = LineRange::new(1.0, 0, 3);
        let mut rng = DeterministicRng::new(5);
        for _ in 0..100 {
            let size = draw_chunk_size(&range, 10, 100, &mut rng);
            assert!((1..=3).contains(&size));
        }
    }

    #[test]
    fn block_ids_are_sequential_and_blank_chunks_skipped() {
        let mut text = String::new();
        for idx in 0..8 {
            text.push_str(&format!("reg r{idx};\n"));
        }
        text.push_str(&"\n".repeat(4));
        text.push_str("endmodule\n");
        let file = SourceFile::from_text("dir/blocks.v", &text);
        let config = ChunkingConfig {
            line_ratios: vec![LineRange::new(1.0, 4, 4)],
            ..ChunkingConfig::default()
        };
        let mut rng = DeterministicRng::new(0);
        let chunks = chunk_file(&file, 7, &config, &mut rng);
        let ids: Vec<String> = chunks.iter().map(|c| c.block_id.to_string()).collect();
        assert_eq!(ids, vec!["block_id_7_1", "block_id_7_2", "block_id_7_3"]);
        assert_eq!(chunks[2].text(), "endmodule");
        assert!(chunks.iter().all(|c| c.file_name == "blocks.v"));
    }
}
