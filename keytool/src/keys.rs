//! Read and write committee member key files.
//!
//! A member's directory holds two files:
//!
//! * `das_bls`: the hex-encoded private key.
//! * `das_bls.pub`: the hex-encoded public key on the first line and a hex-encoded proof of
//!   possession of the private key on the second.
//!
//! Keysets are only assembled from public keys whose proof of possession verifies, which rules
//! out rogue-key attacks on aggregate signatures.

use anytrust_cryptography::{PrivateKey, PublicKey, Signature};
use anytrust_das::Keyset;
use rand::{CryptoRng, Rng};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;

/// Name of the private key file.
pub const PRIVATE_FILE: &str = "das_bls";

/// Name of the public key file.
pub const PUBLIC_FILE: &str = "das_bls.pub";

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid key: {0}")]
    InvalidKey(#[from] anytrust_cryptography::Error),
    #[error("key already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("missing proof of possession: {0}")]
    MissingProof(PathBuf),
    #[error("invalid proof of possession: {0}")]
    InvalidProof(PathBuf),
    #[error("invalid keyset: {0}")]
    Keyset(#[from] anytrust_das::Error),
}

/// Generate a key pair in `dir`, refusing to replace an existing private key.
pub async fn generate<R: Rng + CryptoRng>(rng: &mut R, dir: &Path) -> Result<PublicKey, Error> {
    let private = PrivateKey::from_rng(rng);
    let public = private.public_key();
    fs::create_dir_all(dir).await?;

    // Private key
    let path = dir.join(PRIVATE_FILE);
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = match options.open(&path).await {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::AlreadyExists(path))
        }
        Err(err) => return Err(err.into()),
    };
    file.write_all(hex::encode(private.to_bytes()).as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.sync_all().await?;

    write_public(&private, dir).await?;
    debug!(?dir, %public, "wrote key files");
    Ok(public)
}

/// Rewrite the public key file in `dir` from the private key stored there.
pub async fn export(dir: &Path) -> Result<PublicKey, Error> {
    let private = read_private(dir).await?;
    write_public(&private, dir).await?;
    Ok(private.public_key())
}

async fn write_public(private: &PrivateKey, dir: &Path) -> Result<(), Error> {
    let contents = format!(
        "{}\n{}\n",
        private.public_key(),
        private.proof_of_possession()
    );
    fs::write(dir.join(PUBLIC_FILE), contents).await?;
    Ok(())
}

/// Read the private key stored in `dir`.
pub async fn read_private(dir: &Path) -> Result<PrivateKey, Error> {
    let contents = fs::read_to_string(dir.join(PRIVATE_FILE)).await?;
    let bytes = hex::decode(contents.trim())?;
    Ok(PrivateKey::from_bytes(&bytes)?)
}

/// Read a public key file and check its proof of possession.
pub async fn read_public(path: &Path) -> Result<PublicKey, Error> {
    let contents = fs::read_to_string(path).await?;
    let mut lines = contents.lines().map(str::trim).filter(|line| !line.is_empty());
    let public = lines
        .next()
        .ok_or_else(|| Error::MissingProof(path.to_path_buf()))?;
    let public = PublicKey::from_bytes(&hex::decode(public)?)?;
    let proof = lines
        .next()
        .ok_or_else(|| Error::MissingProof(path.to_path_buf()))?;
    let proof = Signature::from_bytes(&hex::decode(proof)?)
        .map_err(|_| Error::InvalidProof(path.to_path_buf()))?;
    public
        .verify_proof_of_possession(&proof)
        .map_err(|_| Error::InvalidProof(path.to_path_buf()))?;
    Ok(public)
}

/// Assemble a keyset from public key files (in the order provided).
pub async fn keyset(paths: &[PathBuf], assumed_honest: u64) -> Result<Keyset, Error> {
    let mut publics = Vec::with_capacity(paths.len());
    for path in paths {
        publics.push(read_public(path).await?);
    }
    Ok(Keyset::new(publics, assumed_honest)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::env;

    fn directory(name: &str) -> PathBuf {
        let mut rng = StdRng::from_entropy();
        env::temp_dir().join(format!("{}_{}", name, rng.gen::<u64>()))
    }

    #[tokio::test]
    async fn test_generate_and_read() {
        let mut rng = StdRng::seed_from_u64(0);
        let dir = directory("keytool_generate");
        let public = generate(&mut rng, &dir).await.unwrap();

        let private = read_private(&dir).await.unwrap();
        assert_eq!(private.public_key(), public);
        assert_eq!(read_public(&dir.join(PUBLIC_FILE)).await.unwrap(), public);

        // Existing keys are never replaced
        assert!(matches!(
            generate(&mut rng, &dir).await,
            Err(Error::AlreadyExists(_))
        ));
        assert_eq!(read_private(&dir).await.unwrap(), private);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_export() {
        let mut rng = StdRng::seed_from_u64(2);
        let dir = directory("keytool_export");
        let public = generate(&mut rng, &dir).await.unwrap();

        // Restore a lost public key file
        std::fs::remove_file(dir.join(PUBLIC_FILE)).unwrap();
        assert_eq!(export(&dir).await.unwrap(), public);
        assert_eq!(read_public(&dir.join(PUBLIC_FILE)).await.unwrap(), public);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_invalid_proof() {
        let dir = directory("keytool_proof");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(PUBLIC_FILE);

        // Proof made with another key
        let private = PrivateKey::from_seed(0);
        let other = PrivateKey::from_seed(1);
        std::fs::write(
            &path,
            format!("{}\n{}\n", private.public_key(), other.proof_of_possession()),
        )
        .unwrap();
        assert!(matches!(read_public(&path).await, Err(Error::InvalidProof(_))));

        // A message signature is not a proof
        let signature = private.sign(&private.public_key().to_bytes());
        std::fs::write(&path, format!("{}\n{}\n", private.public_key(), signature)).unwrap();
        assert!(matches!(read_public(&path).await, Err(Error::InvalidProof(_))));

        // Missing proof
        std::fs::write(&path, format!("{}\n", private.public_key())).unwrap();
        assert!(matches!(read_public(&path).await, Err(Error::MissingProof(_))));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_keyset() {
        let mut rng = StdRng::seed_from_u64(1);
        let root = directory("keytool_keyset");
        let mut paths = Vec::new();
        let mut publics = Vec::new();
        for i in 0..3 {
            let dir = root.join(format!("member-{}", i));
            publics.push(generate(&mut rng, &dir).await.unwrap());
            paths.push(dir.join(PUBLIC_FILE));
        }

        let keyset = keyset(&paths, 2).await.unwrap();
        assert_eq!(keyset, Keyset::new(publics, 2).unwrap());
        assert_eq!(Keyset::deserialize(&keyset.serialize()).unwrap(), keyset);

        // Threshold is validated
        assert!(matches!(
            super::keyset(&paths, 4).await,
            Err(Error::Keyset(anytrust_das::Error::InvalidThreshold(4, 3)))
        ));

        // Duplicate members are rejected
        let duplicate = vec![paths[0].clone(), paths[0].clone()];
        assert!(matches!(
            super::keyset(&duplicate, 1).await,
            Err(Error::Keyset(anytrust_das::Error::DuplicateMember(1)))
        ));
        std::fs::remove_dir_all(root).unwrap();
    }
}
