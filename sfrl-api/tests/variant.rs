use sfrl_api::variant::{GridAxis, VariantSpec};
use std::path::PathBuf;

fn base_spec() -> VariantSpec {
    VariantSpec::for_domain("swimmer")
        .unwrap()
        .with_snapshot("/data/runs/run_12/itr_500.pkl")
        .with_log_dir_base("/logs")
}

#[test]
fn grid_axes_expand_into_the_cross_product() {
    let mut spec = base_spec();
    spec.seed = GridAxis::Grid(vec![1, 2]);
    spec.lr = GridAxis::Grid(vec![1e-3, 1e-4]);
    let variants = spec.expand();
    assert_eq!(variants.len(), 4);
    let pairs: Vec<(u64, f64)> = variants.iter().map(|v| (v.seed, v.lr)).collect();
    assert_eq!(pairs, vec![(1, 1e-3), (1, 1e-4), (2, 1e-3), (2, 1e-4)]);
}

#[test]
fn log_dir_names_are_byte_stable() {
    let mut spec = base_spec();
    spec.lr = GridAxis::Grid(vec![1e-3, 1e-4]);
    let variants = spec.expand();
    assert_eq!(variants.len(), 2);
    assert_eq!(
        variants[0].log_dir,
        PathBuf::from("/logs/finetune__run_12____lr_0.001__use_pretrained_values_False")
    );
    assert_eq!(
        variants[1].log_dir,
        PathBuf::from("/logs/finetune__run_12____lr_0.0001__use_pretrained_values_False")
    );
}

#[test]
fn pretrained_values_flag_lands_in_the_name() {
    let mut spec = base_spec();
    spec.lr = GridAxis::Fixed(3e-4);
    spec.use_pretrained_values = true;
    let variants = spec.expand();
    assert_eq!(
        variants[0].log_dir,
        PathBuf::from("/logs/finetune__run_12____lr_0.0003__use_pretrained_values_True")
    );
}

#[test]
fn video_dir_nests_under_the_log_dir() {
    let variants = base_spec().expand();
    assert_eq!(variants[0].video_dir, variants[0].log_dir.join("videos"));
}

#[test]
fn domain_entries_override_the_common_parameters() {
    let swimmer = VariantSpec::for_domain("swimmer").unwrap();
    assert_eq!(swimmer.env_name, "Swimmer-v1");
    assert_eq!(swimmer.n_epochs, 2000);
    assert_eq!(swimmer.target_entropy, -2.);
    assert_eq!(swimmer.layer_size, 300);
    assert_eq!(swimmer.max_pool_size, 1_000_000);

    let cheetah = VariantSpec::for_domain("half-cheetah").unwrap();
    assert_eq!(cheetah.max_pool_size, 10_000_000);

    let point = VariantSpec::for_domain("point").unwrap();
    assert_eq!(point.layer_size, 32);
    assert_eq!(point.max_path_length, 100);
    assert_eq!(point.n_epochs, 50);
}

#[test]
fn unknown_domains_are_a_configuration_error() {
    assert!(VariantSpec::for_domain("tetris").is_err());
}

#[test]
fn expansion_leaves_shared_fields_identical() {
    let mut spec = base_spec();
    spec.lr = GridAxis::Grid(vec![1e-3, 1e-4]);
    let variants = spec.expand();
    for variant in &variants {
        assert_eq!(variant.env_name, "Swimmer-v1");
        assert_eq!(variant.batch_size, 128);
        assert_eq!(
            variant.snapshot_filename,
            PathBuf::from("/data/runs/run_12/itr_500.pkl")
        );
    }
}
