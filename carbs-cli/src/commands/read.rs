use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use carbs::{Carbs, Cid};

pub fn print_roots(car: &Path, strict: bool) -> Result<()> {
    let carbs = Carbs::open(car, strict).with_context(|| format!("open {}", car.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    for root in carbs.roots() {
        writeln!(out, "{root}")?;
    }
    out.flush()?;
    Ok(())
}

pub fn get_block(car: &Path, cid: &str, out_path: Option<&Path>, strict: bool) -> Result<()> {
    let cid = Cid::try_from(cid).with_context(|| format!("parse cid {cid:?}"))?;
    let carbs = Carbs::open(car, strict).with_context(|| format!("open {}", car.display()))?;
    let data = carbs
        .get(&cid)
        .with_context(|| format!("get {cid} from {}", car.display()))?;

    let mut out: Box<dyn Write> = match out_path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("create {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    out.write_all(data)?;
    out.flush()?;
    Ok(())
}
