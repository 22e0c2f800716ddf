use anyhow::{Context, Result, bail};
use std::{path::Path, time::Instant};
use tracing::{info, warn};

use carbs::{
    Carbs, Index, IndexCodec, default_codec, index_path, record::first_occurrences, save,
    scan_records,
};

pub fn build_index(car: &Path, codec: Option<IndexCodec>, force: bool) -> Result<()> {
    let idx_path = index_path(car);
    if idx_path.exists() && !force {
        bail!(
            "index already exists: {} (use --force to rebuild)",
            idx_path.display()
        );
    }

    let start = Instant::now();
    let records = scan_records(car).with_context(|| format!("scan {}", car.display()))?;
    let codec = codec.unwrap_or_else(|| default_codec(&records));
    let index = Index::build(codec, &records).with_context(|| format!("build {codec} index"))?;
    save(&index, car).with_context(|| format!("write {}", idx_path.display()))?;

    info!(
        "Indexed {} blocks ({} unique) with {} in {:.2}s -> {}",
        records.len(),
        index.len(),
        codec,
        start.elapsed().as_secs_f64(),
        idx_path.display()
    );
    Ok(())
}

pub fn verify_index(car: &Path) -> Result<()> {
    let carbs = Carbs::open(car, true).with_context(|| format!("open {}", car.display()))?;
    let records = scan_records(car).with_context(|| format!("scan {}", car.display()))?;
    let unique = first_occurrences(&records);

    let mut bad = 0usize;
    for r in &unique {
        let got = carbs.index().get(&r.cid);
        if got != r.offset {
            bad += 1;
            warn!("{}: index says {}, first section is at {}", r.cid, got, r.offset);
            continue;
        }
        if let Err(e) = carbs.get(&r.cid) {
            bad += 1;
            warn!("{}: {e}", r.cid);
        }
    }

    if carbs.index().len() != unique.len() {
        warn!(
            "index holds {} records, archive has {} unique blocks",
            carbs.index().len(),
            unique.len()
        );
    }

    if bad > 0 {
        bail!("{bad} of {} blocks failed verification", unique.len());
    }
    info!(
        "OK: {} blocks verified against {} index",
        unique.len(),
        carbs.index().codec()
    );
    Ok(())
}
