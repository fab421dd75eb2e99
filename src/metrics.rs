//! Observability helpers: a CSV sink for ciphertext shape over time and
//! algebraic probes used when inspecting the multiplication invariant.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::ctsafe as ct;
use crate::field::{fp_add, fp_mul, fp_sub, Fp, FP_ZERO};
use crate::ops::sigma_density;
use crate::{Cipher, PubKey, Result, Sign};

/// Appending CSV writer with the header
/// `tag,edges,layers,sigma_density,value_lo,value_hi`.
pub struct MetricsSink {
    out: BufWriter<std::fs::File>,
}

impl MetricsSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<MetricsSink> {
        let fresh = std::fs::metadata(path.as_ref())
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let mut out = BufWriter::new(file);

        if fresh {
            writeln!(out, "tag,edges,layers,sigma_density,value_lo,value_hi")?;
        }

        Ok(MetricsSink { out })
    }

    pub fn record(&mut self, pk: &PubKey, tag: &str, c: &Cipher, val: Fp) -> Result<()> {
        writeln!(
            self.out,
            "{},{},{},{:.6},{},{}",
            tag,
            c.edges.len(),
            c.layers.len(),
            sigma_density(pk, c),
            val.lo,
            val.hi
        )?;
        self.out.flush()?;
        Ok(())
    }
}

/// Shannon entropy of the tag byte distribution, in bits per byte.
pub fn sigma_shannon(c: &Cipher) -> f64 {
    let mut freq = [0u64; 256];
    let mut total = 0u64;

    for e in &c.edges {
        for &w in &e.tag.words {
            for i in 0..8 {
                freq[((w >> (i * 8)) & 0xff) as usize] += 1;
                total += 1;
            }
        }
    }

    if total == 0 {
        return 0.0;
    }

    let mut h = 0.0;
    for &f in &freq {
        if f > 0 {
            let p = f as f64 / total as f64;
            h -= p * p.log2();
        }
    }
    h
}

/// Signed weighted generator sum of one layer's edges.
pub fn layer_weighted_sum(pk: &PubKey, c: &Cipher, lid: u32) -> Fp {
    let mut s = FP_ZERO;

    for e in &c.edges {
        if e.layer_id != lid {
            continue;
        }
        let term = fp_mul(e.weight, pk.pow_g[usize::from(e.idx)]);
        s = match e.sign {
            Sign::Plus => fp_add(s, term),
            Sign::Minus => fp_sub(s, term),
        };
    }

    s
}

/// Checks that every product layer of `c = a * b` carries exactly the
/// product of its parents' weighted sums.
pub fn product_sums_consistent(pk: &PubKey, a: &Cipher, b: &Cipher, c: &Cipher) -> bool {
    let la = a.layers.len() as u32;
    let lb = b.layers.len() as u32;
    let base = la + lb;

    for pa in 0..la {
        for pb in 0..lb {
            let lc = base + pa * lb + pb;

            let sa = layer_weighted_sum(pk, a, pa);
            let sb = layer_weighted_sum(pk, b, pb);
            let sc = layer_weighted_sum(pk, c, lc);

            if ct::fp_eq(&sc, &fp_mul(sa, sb)) == 0 {
                return false;
            }
        }
    }

    true
}
