//! End-to-end runs over real directories of synthetic images.

use std::{fs, path::Path};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use phash_robustness::{
    CellStatus, EvaluationConfig, FingerprintExtractor, evaluate,
    catalogue::{Manipulation, ManipulationCatalogue},
    error::RobustnessError,
    evaluation::Evaluator,
    manipulation::{GeneratorConfig, ManipulationGenerator},
    report::ReportWriter,
    scoring::score,
};

fn pattern(width: u32, height: u32, variant: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width) as u8;
        let g = ((y * 255) / height) as u8;
        let block = 8 + variant * 4;
        let checker = if (x / block + y / block) % 2 == 0 { 70 } else { 0 };
        Rgb([r.saturating_add(checker), g, (variant * 60 % 256) as u8])
    })
}

/// PNG bytes under whatever name is given; the loader sniffs content.
fn write_png(path: &Path, image: &RgbImage) {
    DynamicImage::ImageRgb8(image.clone())
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

fn rotate_flip_catalogue() -> ManipulationCatalogue {
    ManipulationCatalogue::new(vec![
        Manipulation::new('b', "rotate"),
        Manipulation::new('c', "flip"),
    ])
    .unwrap()
}

struct Fixture {
    _root: tempfile::TempDir,
    originals: std::path::PathBuf,
    manipulated: std::path::PathBuf,
}

/// Three originals; every rotate variant present, one flip variant present,
/// one flip variant corrupt, one missing.
fn fixture() -> Fixture {
    let root = tempfile::tempdir().unwrap();
    let originals = root.path().join("originals");
    let manipulated = root.path().join("manipulated");
    fs::create_dir_all(&originals).unwrap();
    fs::create_dir_all(&manipulated).unwrap();

    for (i, id) in ["img1", "img2", "img3"].iter().enumerate() {
        let img = pattern(96, 72, i as u32);
        write_png(&originals.join(format!("{}.png", id)), &img);
        write_png(&manipulated.join(format!("{}b.jpg", id)), &img);
    }
    write_png(&manipulated.join("img1c.jpg"), &pattern(96, 72, 0));
    fs::write(manipulated.join("img2c.jpg"), b"definitely not an image").unwrap();
    fs::write(originals.join("notes.txt"), b"ignored").unwrap();

    Fixture {
        _root: root,
        originals,
        manipulated,
    }
}

#[test]
fn test_table_shape_and_sentinels() {
    let fx = fixture();
    let table = evaluate(&fx.originals, &fx.manipulated, &rotate_flip_catalogue()).unwrap();

    assert_eq!(table.row_count(), 3);
    assert_eq!(table.column_count(), 2);
    assert!(table.rows().iter().all(|r| r.cells.len() == 2));

    let ids = table.rows().iter().map(|r| r.image_id.as_str()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["img1", "img2", "img3"]);

    for row in table.rows() {
        assert_eq!(row.cells[0].status, CellStatus::Scored);
        assert_eq!(row.cells[0].score, 100.0);
    }

    let img1 = table.row("img1").unwrap();
    assert_eq!(img1.cells[1].score, 100.0);

    let img2 = table.row("img2").unwrap();
    assert_eq!(img2.cells[1].status, CellStatus::DecodeFailed);
    assert_eq!(img2.cells[1].score, 0.0);

    let img3 = table.row("img3").unwrap();
    assert_eq!(img3.cells[1].status, CellStatus::Missing);
    assert_eq!(img3.cells[1].score, 0.0);
    assert_eq!(img3.avg_score, 50.0);
}

#[test]
fn test_hardest_and_diagnostics() {
    let fx = fixture();
    let table = evaluate(&fx.originals, &fx.manipulated, &rotate_flip_catalogue()).unwrap();

    let hardest = table.hardest().unwrap();
    assert_eq!(hardest.name, "flip");
    assert!((hardest.mean - 100.0 / 3.0).abs() < 1e-9);

    let diagnostics = table.diagnostics();
    assert_eq!(diagnostics.scored, 4);
    assert_eq!(diagnostics.missing, 1);
    assert_eq!(diagnostics.decode_failed, 1);
    assert!(diagnostics.unreadable_originals.is_empty());
}

#[test]
fn test_sequential_and_parallel_runs_are_identical() {
    let fx = fixture();
    let catalogue = rotate_flip_catalogue();

    let parallel = Evaluator::new(catalogue.clone())
        .evaluate(&fx.originals, &fx.manipulated)
        .unwrap();
    let again = Evaluator::new(catalogue.clone())
        .evaluate(&fx.originals, &fx.manipulated)
        .unwrap();
    let sequential = Evaluator::new(catalogue)
        .with_config(EvaluationConfig::default().with_parallel(false))
        .evaluate(&fx.originals, &fx.manipulated)
        .unwrap();

    assert_eq!(parallel, again);
    assert_eq!(parallel, sequential);
}

#[test]
fn test_config_builders_filter_originals_and_label_method() {
    let fx = fixture();
    write_png(&fx.originals.join("img0.jpg"), &pattern(64, 64, 3));

    let config = EvaluationConfig::default()
        .with_original_extensions(vec!["png".to_string()])
        .with_method("dct_phash");
    let table = Evaluator::new(rotate_flip_catalogue())
        .with_config(config)
        .evaluate(&fx.originals, &fx.manipulated)
        .unwrap();

    assert_eq!(table.row_count(), 3);
    assert!(table.row("img0").is_none());
    assert_eq!(table.method(), "dct_phash");
    assert!(table.rows().iter().all(|r| r.method == "dct_phash"));
}

#[test]
fn test_unreadable_original_yields_sentinel_row() {
    let fx = fixture();
    fs::write(fx.originals.join("img0.jpg"), b"garbage").unwrap();
    write_png(&fx.manipulated.join("img0b.jpg"), &pattern(32, 32, 1));

    let table = evaluate(&fx.originals, &fx.manipulated, &rotate_flip_catalogue()).unwrap();
    let row = table.row("img0").unwrap();

    assert!(!row.original_readable);
    assert_eq!(row.cells[0].status, CellStatus::DecodeFailed);
    assert_eq!(row.cells[1].status, CellStatus::Missing);
    assert_eq!(row.avg_score, 0.0);
    assert_eq!(table.diagnostics().unreadable_originals, vec!["img0".to_string()]);
}

#[test]
fn test_missing_directories_are_fatal() {
    let fx = fixture();
    let catalogue = rotate_flip_catalogue();

    let err = evaluate(fx.originals.join("absent"), &fx.manipulated, &catalogue).unwrap_err();
    assert!(matches!(err, RobustnessError::Enumeration { .. }));

    let err = evaluate(&fx.originals, fx.manipulated.join("absent"), &catalogue).unwrap_err();
    assert!(matches!(err, RobustnessError::Enumeration { .. }));
}

#[test]
fn test_empty_originals_gives_empty_table() {
    let root = tempfile::tempdir().unwrap();
    let table = evaluate(root.path(), root.path(), &rotate_flip_catalogue()).unwrap();

    assert!(table.is_empty());
    assert!(table.hardest().is_none());
}

#[test]
fn test_self_similarity_for_real_files() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("a.png");
    write_png(&path, &pattern(50, 80, 2));

    let extractor = FingerprintExtractor::new();
    let a = extractor.extract_path(&path).unwrap();
    let b = extractor.extract_path(&path).unwrap();
    assert_eq!(score(&a, &b).unwrap(), 100.0);
}

#[test]
fn test_generate_then_evaluate_reference_catalogue() {
    let root = tempfile::tempdir().unwrap();
    let originals = root.path().join("originals");
    let manipulated = root.path().join("manipulated");
    fs::create_dir_all(&originals).unwrap();
    for i in 0..3 {
        write_png(&originals.join(format!("art_{}.png", i)), &pattern(120, 90, i));
    }

    let catalogue = ManipulationCatalogue::reference();
    let generator = ManipulationGenerator::new(&catalogue, GeneratorConfig::default()).unwrap();
    let written = generator.generate(&originals, &manipulated).unwrap();
    assert_eq!(written, 3 * 14);
    assert!(manipulated.join("art_0a.jpg").is_file());
    assert!(manipulated.join("art_2n.jpg").is_file());

    let table = evaluate(&originals, &manipulated, &catalogue).unwrap();
    assert_eq!(table.row_count(), 3);
    assert_eq!(table.column_count(), 14);
    assert_eq!(table.diagnostics().scored, 42);
    assert!(
        table
            .rows()
            .iter()
            .flat_map(|r| r.cells.iter())
            .all(|c| (0.0..=100.0).contains(&c.score))
    );

    let stats = table.aggregates();
    let mean_of = |name: &str| stats.iter().find(|s| s.name == name).unwrap().mean;
    assert!(mean_of("invert_colors") < mean_of("jpeg_compression"));

    let paths = ReportWriter::new(root.path().join("results"))
        .with_plots(false)
        .write_all(&table)
        .unwrap();
    let csv = fs::read_to_string(paths.csv).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.starts_with("image_id,crop_20,rotate_10,flip_h,"));
}

#[test]
fn test_generation_is_reproducible() {
    let root = tempfile::tempdir().unwrap();
    let originals = root.path().join("originals");
    fs::create_dir_all(&originals).unwrap();
    for i in 0..4 {
        write_png(&originals.join(format!("p{}.png", i)), &pattern(40, 40, i));
    }

    let catalogue = ManipulationCatalogue::new(vec![
        Manipulation::new('g', "noise_saltpepper"),
        Manipulation::new('l', "collage"),
    ])
    .unwrap();
    let generator = ManipulationGenerator::new(&catalogue, GeneratorConfig::default().with_seed(7)).unwrap();

    generator.generate(&originals, root.path().join("one")).unwrap();
    generator.generate(&originals, root.path().join("two")).unwrap();

    for name in ["p0g.jpg", "p3l.jpg"] {
        let one = fs::read(root.path().join("one").join(name)).unwrap();
        let two = fs::read(root.path().join("two").join(name)).unwrap();
        assert_eq!(one, two, "{} differs between runs", name);
    }
}
