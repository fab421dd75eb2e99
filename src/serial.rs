//! Binary readers and writers for the three key/ciphertext formats plus
//! the params JSON sidecar. All multi-byte integers are little-endian;
//! readers reject unknown magic numbers and versions, and vet externally
//! supplied field elements for canonical form.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::bitvec::BitVec;
use crate::field::{fp_is_canonical, Fp};
use crate::{
    Cipher, Edge, Layer, Nonce128, Params, PubKey, PvacError, RSeed, Result, SecKey, Sign, Ubk,
};

pub const MAGIC_CT: u32 = 0x6669_9666;
pub const MAGIC_PK: u32 = 0x0666_0666;
pub const MAGIC_SK: u32 = 0x6666_6999;
pub const FORMAT_VERSION: u32 = 1;

fn check_header<R: Read>(r: &mut R, magic: u32, what: &str) -> Result<()> {
    let m = r.read_u32::<LittleEndian>()?;
    if m != magic {
        return Err(PvacError::Format(format!(
            "{}: wrong magic {:#010x}",
            what, m
        )));
    }
    let v = r.read_u32::<LittleEndian>()?;
    if v != FORMAT_VERSION {
        return Err(PvacError::Format(format!(
            "{}: unsupported version {}",
            what, v
        )));
    }
    Ok(())
}

fn write_fp<W: Write>(w: &mut W, f: Fp) -> Result<()> {
    w.write_u64::<LittleEndian>(f.lo)?;
    w.write_u64::<LittleEndian>(f.hi)?;
    Ok(())
}

fn read_fp<R: Read>(r: &mut R) -> Result<Fp> {
    let lo = r.read_u64::<LittleEndian>()?;
    let hi = r.read_u64::<LittleEndian>()?;
    if !fp_is_canonical(lo, hi) {
        return Err(PvacError::NonCanonical);
    }
    Ok(Fp { lo, hi })
}

fn write_bv<W: Write>(w: &mut W, b: &BitVec) -> Result<()> {
    w.write_u32::<LittleEndian>(b.nbits as u32)?;
    for word in &b.words {
        w.write_u64::<LittleEndian>(*word)?;
    }
    Ok(())
}

fn read_bv<R: Read>(r: &mut R) -> Result<BitVec> {
    let nbits = r.read_u32::<LittleEndian>()? as usize;
    let mut b = BitVec::new(nbits);
    for word in &mut b.words {
        *word = r.read_u64::<LittleEndian>()?;
    }
    if nbits & 63 != 0 {
        let tail = b.words[b.words.len() - 1] >> (nbits & 63);
        if tail != 0 {
            return Err(PvacError::Format(
                "bit vector carries set bits past nbits".to_string(),
            ));
        }
    }
    Ok(b)
}

fn write_layer<W: Write>(w: &mut W, layer: &Layer) -> Result<()> {
    match layer {
        Layer::Base { seed } => {
            w.write_u8(0)?;
            w.write_u64::<LittleEndian>(seed.ztag)?;
            w.write_u64::<LittleEndian>(seed.nonce.lo)?;
            w.write_u64::<LittleEndian>(seed.nonce.hi)?;
        }
        Layer::Prod { pa, pb, .. } => {
            w.write_u8(1)?;
            w.write_u32::<LittleEndian>(*pa)?;
            w.write_u32::<LittleEndian>(*pb)?;
        }
    }
    Ok(())
}

fn read_layer<R: Read>(r: &mut R) -> Result<Layer> {
    match r.read_u8()? {
        0 => {
            let ztag = r.read_u64::<LittleEndian>()?;
            let lo = r.read_u64::<LittleEndian>()?;
            let hi = r.read_u64::<LittleEndian>()?;
            Ok(Layer::Base {
                seed: RSeed {
                    ztag,
                    nonce: Nonce128 { lo, hi },
                },
            })
        }
        1 => {
            let pa = r.read_u32::<LittleEndian>()?;
            let pb = r.read_u32::<LittleEndian>()?;
            // Product seeds only matter at creation time; they are not
            // part of the wire format.
            Ok(Layer::Prod {
                seed: RSeed::ZERO,
                pa,
                pb,
            })
        }
        rule => Err(PvacError::Format(format!("unknown layer rule {}", rule))),
    }
}

fn write_edge<W: Write>(w: &mut W, e: &Edge) -> Result<()> {
    w.write_u32::<LittleEndian>(e.layer_id)?;
    w.write_u16::<LittleEndian>(e.idx)?;
    w.write_u8(e.sign.as_u8())?;
    w.write_u8(0)?;
    write_fp(w, e.weight)?;
    write_bv(w, &e.tag)
}

fn read_edge<R: Read>(r: &mut R) -> Result<Edge> {
    let layer_id = r.read_u32::<LittleEndian>()?;
    let idx = r.read_u16::<LittleEndian>()?;
    let sign_byte = r.read_u8()?;
    let _pad = r.read_u8()?;
    let sign = Sign::from_u8(sign_byte)
        .ok_or_else(|| PvacError::Format(format!("invalid edge sign {}", sign_byte)))?;
    let weight = read_fp(r)?;
    let tag = read_bv(r)?;
    Ok(Edge {
        layer_id,
        idx,
        sign,
        weight,
        tag,
    })
}

fn write_cipher<W: Write>(w: &mut W, c: &Cipher) -> Result<()> {
    w.write_u32::<LittleEndian>(c.layers.len() as u32)?;
    w.write_u32::<LittleEndian>(c.edges.len() as u32)?;
    for layer in &c.layers {
        write_layer(w, layer)?;
    }
    for e in &c.edges {
        write_edge(w, e)?;
    }
    Ok(())
}

fn read_cipher<R: Read>(r: &mut R) -> Result<Cipher> {
    let nl = r.read_u32::<LittleEndian>()? as usize;
    let ne = r.read_u32::<LittleEndian>()? as usize;

    let mut c = Cipher::default();
    c.layers.reserve(nl);
    c.edges.reserve(ne);

    for _ in 0..nl {
        c.layers.push(read_layer(r)?);
    }
    for _ in 0..ne {
        c.edges.push(read_edge(r)?);
    }
    Ok(c)
}

/// Writes a ciphertext file: magic, version, count, then each cipher.
pub fn write_ciphertexts<W: Write>(w: &mut W, cts: &[Cipher]) -> Result<()> {
    w.write_u32::<LittleEndian>(MAGIC_CT)?;
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    w.write_u64::<LittleEndian>(cts.len() as u64)?;
    for c in cts {
        write_cipher(w, c)?;
    }
    Ok(())
}

pub fn read_ciphertexts<R: Read>(r: &mut R) -> Result<Vec<Cipher>> {
    check_header(r, MAGIC_CT, "ciphertext file")?;
    let count = r.read_u64::<LittleEndian>()? as usize;
    let mut cts = Vec::with_capacity(count.min(1 << 20));
    for _ in 0..count {
        cts.push(read_cipher(r)?);
    }
    Ok(cts)
}

fn write_params<W: Write>(w: &mut W, p: &Params) -> Result<()> {
    w.write_u32::<LittleEndian>(p.b)?;
    w.write_u64::<LittleEndian>(p.m_bits as u64)?;
    w.write_u64::<LittleEndian>(p.n_bits as u64)?;
    w.write_u64::<LittleEndian>(p.h_col_wt as u64)?;
    w.write_u64::<LittleEndian>(p.x_col_wt as u64)?;
    w.write_u64::<LittleEndian>(p.err_wt as u64)?;
    w.write_u64::<LittleEndian>(p.noise_entropy_bits.to_bits())?;
    w.write_u64::<LittleEndian>(p.tuple2_fraction.to_bits())?;
    w.write_u64::<LittleEndian>(p.depth_slope_bits.to_bits())?;
    w.write_u64::<LittleEndian>(p.edge_budget as u64)?;
    w.write_u64::<LittleEndian>(p.lpn_n as u64)?;
    w.write_u64::<LittleEndian>(p.lpn_t as u64)?;
    w.write_u64::<LittleEndian>(p.lpn_tau_num)?;
    w.write_u64::<LittleEndian>(p.lpn_tau_den)?;
    w.write_u64::<LittleEndian>(p.recrypt_lo.to_bits())?;
    w.write_u64::<LittleEndian>(p.recrypt_hi.to_bits())?;
    w.write_u32::<LittleEndian>(p.recrypt_rounds)?;
    Ok(())
}

fn read_params<R: Read>(r: &mut R) -> Result<Params> {
    Ok(Params {
        b: r.read_u32::<LittleEndian>()?,
        m_bits: r.read_u64::<LittleEndian>()? as usize,
        n_bits: r.read_u64::<LittleEndian>()? as usize,
        h_col_wt: r.read_u64::<LittleEndian>()? as usize,
        x_col_wt: r.read_u64::<LittleEndian>()? as usize,
        err_wt: r.read_u64::<LittleEndian>()? as usize,
        noise_entropy_bits: f64::from_bits(r.read_u64::<LittleEndian>()?),
        tuple2_fraction: f64::from_bits(r.read_u64::<LittleEndian>()?),
        depth_slope_bits: f64::from_bits(r.read_u64::<LittleEndian>()?),
        edge_budget: r.read_u64::<LittleEndian>()? as usize,
        lpn_n: r.read_u64::<LittleEndian>()? as usize,
        lpn_t: r.read_u64::<LittleEndian>()? as usize,
        lpn_tau_num: r.read_u64::<LittleEndian>()?,
        lpn_tau_den: r.read_u64::<LittleEndian>()?,
        recrypt_lo: f64::from_bits(r.read_u64::<LittleEndian>()?),
        recrypt_hi: f64::from_bits(r.read_u64::<LittleEndian>()?),
        recrypt_rounds: r.read_u32::<LittleEndian>()?,
    })
}

/// Writes a public-key file: params, canon tag, H digest and columns,
/// the permutation with its inverse, omega, and the generator powers.
pub fn write_public_key<W: Write>(w: &mut W, pk: &PubKey) -> Result<()> {
    w.write_u32::<LittleEndian>(MAGIC_PK)?;
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    write_params(w, &pk.params)?;
    w.write_u64::<LittleEndian>(pk.canon_tag)?;
    w.write_all(&pk.h_digest)?;

    w.write_u64::<LittleEndian>(pk.h_cols.len() as u64)?;
    for col in &pk.h_cols {
        write_bv(w, col)?;
    }

    w.write_u64::<LittleEndian>(pk.ubk.perm.len() as u64)?;
    for v in &pk.ubk.perm {
        w.write_u32::<LittleEndian>(*v)?;
    }
    w.write_u64::<LittleEndian>(pk.ubk.inv.len() as u64)?;
    for v in &pk.ubk.inv {
        w.write_u32::<LittleEndian>(*v)?;
    }

    write_fp(w, pk.omega_b)?;
    w.write_u64::<LittleEndian>(pk.pow_g.len() as u64)?;
    for f in &pk.pow_g {
        write_fp(w, *f)?;
    }
    Ok(())
}

pub fn read_public_key<R: Read>(r: &mut R) -> Result<PubKey> {
    check_header(r, MAGIC_PK, "public-key file")?;

    let params = read_params(r)?;
    let canon_tag = r.read_u64::<LittleEndian>()?;
    let mut h_digest = [0u8; 32];
    r.read_exact(&mut h_digest)?;

    let ncols = r.read_u64::<LittleEndian>()? as usize;
    let mut h_cols = Vec::with_capacity(ncols.min(1 << 24));
    for _ in 0..ncols {
        h_cols.push(read_bv(r)?);
    }

    let nperm = r.read_u64::<LittleEndian>()? as usize;
    let mut perm = Vec::with_capacity(nperm.min(1 << 24));
    for _ in 0..nperm {
        perm.push(r.read_u32::<LittleEndian>()?);
    }
    let ninv = r.read_u64::<LittleEndian>()? as usize;
    let mut inv = Vec::with_capacity(ninv.min(1 << 24));
    for _ in 0..ninv {
        inv.push(r.read_u32::<LittleEndian>()?);
    }

    if perm.len() != params.m_bits || inv.len() != params.m_bits {
        return Err(PvacError::Format(
            "permutation length disagrees with m_bits".to_string(),
        ));
    }

    let omega_b = read_fp(r)?;
    let npow = r.read_u64::<LittleEndian>()? as usize;
    let mut pow_g = Vec::with_capacity(npow.min(1 << 24));
    for _ in 0..npow {
        pow_g.push(read_fp(r)?);
    }

    if pow_g.len() != params.b as usize {
        return Err(PvacError::Format(
            "generator table length disagrees with b".to_string(),
        ));
    }

    Ok(PubKey {
        params,
        canon_tag,
        h_cols,
        h_digest,
        ubk: Ubk { perm, inv },
        omega_b,
        pow_g,
    })
}

/// Writes a secret-key file: the four PRF keys and the LPN secret words.
pub fn write_secret_key<W: Write>(w: &mut W, sk: &SecKey) -> Result<()> {
    w.write_u32::<LittleEndian>(MAGIC_SK)?;
    w.write_u32::<LittleEndian>(FORMAT_VERSION)?;
    for k in &sk.prf_keys {
        w.write_u64::<LittleEndian>(*k)?;
    }
    w.write_u64::<LittleEndian>(sk.lpn_s_bits.len() as u64)?;
    for word in &sk.lpn_s_bits {
        w.write_u64::<LittleEndian>(*word)?;
    }
    Ok(())
}

pub fn read_secret_key<R: Read>(r: &mut R) -> Result<SecKey> {
    check_header(r, MAGIC_SK, "secret-key file")?;

    let mut prf_keys = [0u64; 4];
    for k in &mut prf_keys {
        *k = r.read_u64::<LittleEndian>()?;
    }

    let nwords = r.read_u64::<LittleEndian>()? as usize;
    let mut lpn_s_bits = Vec::with_capacity(nwords.min(1 << 24));
    for _ in 0..nwords {
        lpn_s_bits.push(r.read_u64::<LittleEndian>()?);
    }

    Ok(SecKey {
        prf_keys,
        lpn_s_bits,
    })
}

// Path conveniences used by the bounty tool and the tests.

pub fn save_ciphertexts<P: AsRef<Path>>(path: P, cts: &[Cipher]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_ciphertexts(&mut w, cts)
}

pub fn load_ciphertexts<P: AsRef<Path>>(path: P) -> Result<Vec<Cipher>> {
    let mut r = BufReader::new(File::open(path)?);
    read_ciphertexts(&mut r)
}

pub fn save_public_key<P: AsRef<Path>>(path: P, pk: &PubKey) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_public_key(&mut w, pk)
}

pub fn load_public_key<P: AsRef<Path>>(path: P) -> Result<PubKey> {
    let mut r = BufReader::new(File::open(path)?);
    read_public_key(&mut r)
}

pub fn save_secret_key<P: AsRef<Path>>(path: P, sk: &SecKey) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_secret_key(&mut w, sk)
}

pub fn load_secret_key<P: AsRef<Path>>(path: P) -> Result<SecKey> {
    let mut r = BufReader::new(File::open(path)?);
    read_secret_key(&mut r)
}

pub fn save_params_json<P: AsRef<Path>>(path: P, prm: &Params) -> Result<()> {
    let w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(w, prm).map_err(|e| PvacError::Format(e.to_string()))
}

pub fn load_params_json<P: AsRef<Path>>(path: P) -> Result<Params> {
    let r = BufReader::new(File::open(path)?);
    serde_json::from_reader(r).map_err(|e| PvacError::Format(e.to_string()))
}
