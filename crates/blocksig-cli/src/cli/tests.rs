use super::*;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_paths_only() {
    let cli = parse(&["blocksig", "in.bin", "out.sig"]);
    assert_eq!(cli.source, PathBuf::from("in.bin"));
    assert_eq!(cli.destination, PathBuf::from("out.sig"));
    assert!(cli.block_size.is_none());
    assert!(cli.algorithm.is_none());
    assert!(cli.workers.is_none());
    assert!(!cli.no_config);
}

#[test]
fn cli_parse_all_flags() {
    let cli = parse(&[
        "blocksig",
        "in.bin",
        "out.sig",
        "--block-size",
        "4096",
        "--algorithm",
        "sha256",
        "-j",
        "3",
        "--no-config",
    ]);
    assert_eq!(cli.block_size, Some(4096));
    assert_eq!(cli.algorithm, Some(DigestAlgorithm::Sha256));
    assert_eq!(cli.workers, Some(3));
    assert!(cli.no_config);
}

#[test]
fn cli_rejects_zero_block_size() {
    assert!(Cli::try_parse_from(["blocksig", "a", "b", "-b", "0"]).is_err());
}

#[test]
fn cli_rejects_unknown_algorithm() {
    assert!(Cli::try_parse_from(["blocksig", "a", "b", "--algorithm", "crc32"]).is_err());
}

#[test]
fn cli_requires_destination() {
    assert!(Cli::try_parse_from(["blocksig", "a"]).is_err());
}

#[test]
fn flags_override_config() {
    let cli = parse(&["blocksig", "a", "b", "-b", "512", "-a", "sha256"]);
    let base = SignatureConfig {
        workers: Some(5),
        ..SignatureConfig::default()
    };
    let cfg = cli.apply(base);
    assert_eq!(cfg.chunk_size_bytes, 512);
    assert_eq!(cfg.algorithm, DigestAlgorithm::Sha256);
    assert_eq!(cfg.workers, Some(5));
    assert_eq!(cfg.backpressure_multiplier, 2);
}

#[test]
fn run_writes_signature_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.bin");
    let dst = dir.path().join("out.sig");
    std::fs::write(&src, vec![9u8; 3000]).unwrap();
    let cli = Cli {
        source: src,
        destination: dst.clone(),
        block_size: Some(1000),
        algorithm: None,
        workers: Some(2),
        no_config: true,
    };
    cli.run().unwrap();
    let text = std::fs::read_to_string(&dst).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert_eq!(text.lines().next(), Some(DigestAlgorithm::Md5.hex_digest(&[9u8; 1000]).as_str()));
}

#[test]
fn run_fails_for_small_source() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.bin");
    std::fs::write(&src, b"tiny").unwrap();
    let cli = Cli {
        source: src,
        destination: dir.path().join("out.sig"),
        block_size: Some(1000),
        algorithm: None,
        workers: Some(1),
        no_config: true,
    };
    assert!(cli.run().is_err());
    assert!(!dir.path().join("out.sig").exists());
}

#[test]
fn run_reports_unsaved_signature_without_failing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in.bin");
    let dst = dir.path().join("missing").join("out.sig");
    std::fs::write(&src, vec![3u8; 2048]).unwrap();
    let cli = Cli {
        source: src,
        destination: dst.clone(),
        block_size: Some(1024),
        algorithm: None,
        workers: Some(2),
        no_config: true,
    };
    assert!(cli.run().is_ok());
    assert!(!dst.exists());
}
