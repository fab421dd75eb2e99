//! Bounty data tool: generates a key set with an encrypted seed string,
//! round-trips it through the on-disk formats, and demonstrates that a
//! single secret-key bit flip breaks decryption.

use std::path::PathBuf;
use std::process::exit;

use rand::rngs::OsRng;
use structopt::StructOpt;

use pvac::metrics::MetricsSink;
use pvac::ops::dec_fp;
use pvac::serial;
use pvac::text::{dec_text, enc_text};
use pvac::{keygen, Params};

#[derive(StructOpt)]
#[structopt(name = "pvac-bounty", about = "Generate and check pvac bounty data sets.")]
enum Cmd {
    /// Generate pk/sk/ct/params.json with an encrypted seed string.
    Gen {
        #[structopt(long, default_value = "bounty_data", parse(from_os_str))]
        out: PathBuf,
        /// The string to encrypt; this is what an attacker goes after.
        #[structopt(long, default_value = "")]
        message: String,
    },
    /// Load a generated data set and decrypt the seed.
    Roundtrip {
        #[structopt(long, default_value = "bounty_data", parse(from_os_str))]
        dir: PathBuf,
    },
    /// Flip one bit of the LPN secret and show decryption failing.
    Bitflip {
        #[structopt(long, default_value = "bounty_data", parse(from_os_str))]
        dir: PathBuf,
    },
}

fn run(cmd: Cmd) -> pvac::Result<()> {
    match cmd {
        Cmd::Gen { out, message } => {
            let prm = Params::default();
            let (pk, sk) = keygen(&prm, &mut OsRng)?;

            println!("enc seed [{} bytes]", message.len());
            let cts = enc_text(&pk, &sk, &message, &mut OsRng);

            std::fs::create_dir_all(&out)?;
            serial::save_ciphertexts(out.join("seed.ct"), &cts)?;
            serial::save_public_key(out.join("pk.bin"), &pk)?;
            serial::save_secret_key(out.join("sk.bin"), &sk)?;
            serial::save_params_json(out.join("params.json"), &prm)?;

            if let Some(first) = cts.first() {
                let mut sink = MetricsSink::open(out.join("metrics.csv"))?;
                sink.record(&pk, "seed0", first, dec_fp(&pk, &sk, first)?)?;
            }

            println!("H = 0x{}", hex::encode(&pk.h_digest[..8]));
            println!("wrote {}/", out.display());
        }

        Cmd::Roundtrip { dir } => {
            let pk = serial::load_public_key(dir.join("pk.bin"))?;
            let sk = serial::load_secret_key(dir.join("sk.bin"))?;
            let cts = serial::load_ciphertexts(dir.join("seed.ct"))?;

            println!(
                "pk.b = {} pk.H = {} sk.s = {}",
                pk.params.b,
                pk.h_cols.len(),
                sk.lpn_s_bits.len()
            );

            let dec = dec_text(&pk, &sk, &cts)?;
            println!("dec: {:?}", dec);
        }

        Cmd::Bitflip { dir } => {
            let pk = serial::load_public_key(dir.join("pk.bin"))?;
            let sk = serial::load_secret_key(dir.join("sk.bin"))?;
            let cts = serial::load_ciphertexts(dir.join("seed.ct"))?;

            if cts.is_empty() {
                println!("empty ciphertext set; nothing to flip");
                return Ok(());
            }

            let good = dec_text(&pk, &sk, &cts)?;

            let mut bad_sk = sk.clone();
            bad_sk.lpn_s_bits[0] ^= 1;

            match dec_text(&pk, &bad_sk, &cts) {
                Ok(t) => {
                    assert_ne!(t, good, "bit-flipped secret key still decrypts");
                    println!("dec_bad: {:?}", t);
                }
                Err(e) => println!("decode failed: {}", e),
            }
            println!("ok");
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Cmd::from_args()) {
        eprintln!("error: {}", e);
        exit(1);
    }
}
