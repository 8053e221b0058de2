//! Benchmark input: point files and random point sets.

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One benchmark row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub uid: u32,
    pub lon: f32,
    pub lat: f32,
}

/// Parse `uid lon lat`, with lon/lat as integer micro-degrees.
pub fn parse_line(line: &str) -> anyhow::Result<Entry> {
    let mut fields = line.split_whitespace();
    let (Some(uid), Some(lon), Some(lat), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        bail!("expected 3 fields, got {:?}", line);
    };

    let uid: u32 = uid.parse().with_context(|| format!("bad uid {uid:?}"))?;
    let lon: i32 = lon.parse().with_context(|| format!("bad lon {lon:?}"))?;
    let lat: i32 = lat.parse().with_context(|| format!("bad lat {lat:?}"))?;

    Ok(Entry {
        uid,
        lon: (lon as f64 / 1e6) as f32,
        lat: (lat as f64 / 1e6) as f32,
    })
}

/// Load every non-blank line of `path`.
pub fn load_file(path: &Path) -> anyhow::Result<Vec<Entry>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut entries = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = parse_line(&line).with_context(|| format!("{}:{}", path.display(), n + 1))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// `count` uniformly spread points over the default window.
pub fn random_entries(count: usize, seed: u64) -> Vec<Entry> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count as u32)
        .map(|uid| Entry {
            uid,
            lon: rng.random_range(geotree::geo::LON_MIN..=geotree::geo::LON_MAX),
            lat: rng.random_range(geotree::geo::LAT_MIN..=geotree::geo::LAT_MAX),
        })
        .collect()
}
