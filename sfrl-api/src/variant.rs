use sfrl_core::error::FinetuneError;
use std::path::{Path, PathBuf};

/// Ordered keys that end up in the output directory name.
pub const TAG_KEYS: [&str; 2] = ["lr", "use_pretrained_values"];

#[derive(Debug, Clone)]
pub enum GridAxis<T> {
    Fixed(T),
    Grid(Vec<T>),
}

impl<T: Clone> GridAxis<T> {
    fn values(&self) -> Vec<T> {
        match self {
            Self::Fixed(value) => vec![value.clone()],
            Self::Grid(values) => values.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvParams {
    pub prefix: &'static str,
    pub env_name: &'static str,
    pub max_path_length: usize,
    pub n_epochs: usize,
    pub target_entropy: f32,
    pub layer_size: Option<usize>,
    pub max_pool_size: Option<usize>,
}

pub fn env_params(domain: &str) -> Option<EnvParams> {
    let defaults = EnvParams {
        prefix: "",
        env_name: "",
        max_path_length: 1000,
        n_epochs: 1000,
        target_entropy: -1.,
        layer_size: None,
        max_pool_size: None,
    };
    let params = match domain {
        // 2 DoF
        "swimmer" => EnvParams {
            prefix: "swimmer",
            env_name: "Swimmer-v1",
            n_epochs: 2000,
            target_entropy: -2.,
            ..defaults
        },
        // 3 DoF
        "hopper" => EnvParams {
            prefix: "hopper",
            env_name: "Hopper-v1",
            n_epochs: 3000,
            target_entropy: -3.,
            ..defaults
        },
        // 6 DoF
        "half-cheetah" => EnvParams {
            prefix: "half-cheetah",
            env_name: "HalfCheetah-v1",
            n_epochs: 1000,
            target_entropy: -6.,
            max_pool_size: Some(10_000_000),
            ..defaults
        },
        // 6 DoF
        "walker" => EnvParams {
            prefix: "walker",
            env_name: "Walker2d-v1",
            n_epochs: 5000,
            target_entropy: -6.,
            ..defaults
        },
        // 8 DoF
        "ant" => EnvParams {
            prefix: "ant",
            env_name: "Ant-v1",
            n_epochs: 10000,
            target_entropy: -8.,
            ..defaults
        },
        // 21 DoF
        "humanoid" => EnvParams {
            prefix: "humanoid",
            env_name: "Humanoid-v1",
            n_epochs: 20000,
            target_entropy: -21.,
            ..defaults
        },
        "point" => EnvParams {
            prefix: "point",
            env_name: "point-rllab",
            layer_size: Some(32),
            max_path_length: 100,
            n_epochs: 50,
            ..defaults
        },
        "inverted-pendulum" => EnvParams {
            prefix: "inverted-pendulum",
            env_name: "InvertedPendulum-v1",
            ..defaults
        },
        "inverted-double-pendulum" => EnvParams {
            prefix: "inverted-double-pendulum",
            env_name: "InvertedDoublePendulum-v1",
            ..defaults
        },
        "pendulum" => EnvParams {
            prefix: "pendulum",
            env_name: "Pendulum-v0",
            layer_size: Some(32),
            max_path_length: 200,
            n_epochs: 50,
            ..defaults
        },
        "mountain-car" => EnvParams {
            prefix: "mountain-car",
            env_name: "MountainCarContinuous-v0",
            ..defaults
        },
        "lunar-lander" => EnvParams {
            prefix: "lunar-lander",
            env_name: "LunarLanderContinuous-v2",
            target_entropy: -4.,
            ..defaults
        },
        "bipedal-walker" => EnvParams {
            prefix: "bipedal-walker",
            env_name: "BipedalWalker-v2",
            target_entropy: -4.,
            ..defaults
        },
        _ => return None,
    };
    Some(params)
}

/// The declarative run configuration: common hyperparameters, the domain
/// overrides baked in by `for_domain`, plus the run specific fields the
/// caller supplies. Immutable once expanded, every `Variant` fully
/// determines one run.
#[derive(Debug, Clone)]
pub struct VariantSpec {
    pub seed: GridAxis<u64>,
    pub lr: GridAxis<f64>,
    pub discount: f32,
    pub tau: f64,
    pub layer_size: usize,
    pub batch_size: usize,
    pub max_pool_size: usize,
    pub n_train_repeat: usize,
    pub epoch_length: usize,
    pub use_pretrained_values: bool,
    pub prefix: String,
    pub env_name: String,
    pub max_path_length: usize,
    pub n_epochs: usize,
    pub target_entropy: f32,
    pub snapshot_filename: PathBuf,
    pub log_dir_base: PathBuf,
    pub universe: String,
    pub domain: String,
    pub task: String,
}

impl VariantSpec {
    pub fn common() -> Self {
        Self {
            seed: GridAxis::Grid(vec![1]),
            lr: GridAxis::Fixed(3e-4),
            discount: 0.99,
            tau: 0.01,
            layer_size: 300,
            batch_size: 128,
            max_pool_size: 1_000_000,
            n_train_repeat: 1,
            epoch_length: 1000,
            use_pretrained_values: false,
            prefix: String::new(),
            env_name: String::new(),
            max_path_length: 1000,
            n_epochs: 1000,
            target_entropy: -1.,
            snapshot_filename: PathBuf::new(),
            log_dir_base: PathBuf::new(),
            universe: "gym".into(),
            domain: String::new(),
            task: "default".into(),
        }
    }

    pub fn for_domain(domain: &str) -> Result<Self, FinetuneError> {
        let params = env_params(domain).ok_or_else(|| {
            FinetuneError::Config(format!("unknown environment domain {domain}"))
        })?;
        let mut spec = Self::common();
        spec.domain = domain.into();
        spec.prefix = params.prefix.into();
        spec.env_name = params.env_name.into();
        spec.max_path_length = params.max_path_length;
        spec.n_epochs = params.n_epochs;
        spec.target_entropy = params.target_entropy;
        if let Some(layer_size) = params.layer_size {
            spec.layer_size = layer_size;
        }
        if let Some(max_pool_size) = params.max_pool_size {
            spec.max_pool_size = max_pool_size;
        }
        Ok(spec)
    }

    pub fn with_snapshot(mut self, snapshot_filename: impl Into<PathBuf>) -> Self {
        self.snapshot_filename = snapshot_filename.into();
        self
    }

    pub fn with_log_dir_base(mut self, log_dir_base: impl Into<PathBuf>) -> Self {
        self.log_dir_base = log_dir_base.into();
        self
    }

    pub fn with_run_context(mut self, universe: impl Into<String>, task: impl Into<String>) -> Self {
        self.universe = universe.into();
        self.task = task.into();
        self
    }

    /// Cross product over the grid axes; everything else is shared.
    pub fn expand(&self) -> Vec<Variant> {
        let mut variants = Vec::new();
        for seed in self.seed.values() {
            for lr in self.lr.values() {
                variants.push(Variant::from_spec(self, seed, lr));
            }
        }
        variants
    }
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub seed: u64,
    pub lr: f64,
    pub discount: f32,
    pub tau: f64,
    pub layer_size: usize,
    pub batch_size: usize,
    pub max_pool_size: usize,
    pub n_train_repeat: usize,
    pub epoch_length: usize,
    pub use_pretrained_values: bool,
    pub prefix: String,
    pub env_name: String,
    pub max_path_length: usize,
    pub n_epochs: usize,
    pub target_entropy: f32,
    pub snapshot_filename: PathBuf,
    pub log_dir: PathBuf,
    pub video_dir: PathBuf,
    pub universe: String,
    pub domain: String,
    pub task: String,
}

impl Variant {
    fn from_spec(spec: &VariantSpec, seed: u64, lr: f64) -> Self {
        let log_dir = spec.log_dir_base.join(tagged_log_dir_name(
            &spec.snapshot_filename,
            lr,
            spec.use_pretrained_values,
        ));
        let video_dir = log_dir.join("videos");
        Self {
            seed,
            lr,
            discount: spec.discount,
            tau: spec.tau,
            layer_size: spec.layer_size,
            batch_size: spec.batch_size,
            max_pool_size: spec.max_pool_size,
            n_train_repeat: spec.n_train_repeat,
            epoch_length: spec.epoch_length,
            use_pretrained_values: spec.use_pretrained_values,
            prefix: spec.prefix.clone(),
            env_name: spec.env_name.clone(),
            max_path_length: spec.max_path_length,
            n_epochs: spec.n_epochs,
            target_entropy: spec.target_entropy,
            snapshot_filename: spec.snapshot_filename.clone(),
            log_dir,
            video_dir,
            universe: spec.universe.clone(),
            domain: spec.domain.clone(),
            task: spec.task.clone(),
        }
    }
}

/// Output directory naming is a stable contract: the parent directory of
/// the snapshot, then the tag keys in declared order with their values.
/// Booleans keep their capitalized historical rendering so existing run
/// directories stay addressable.
fn tagged_log_dir_name(snapshot_filename: &Path, lr: f64, use_pretrained_values: bool) -> String {
    let snapshot_parent = snapshot_filename
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tags = [
        format!("{}_{}", TAG_KEYS[0], lr),
        format!(
            "{}_{}",
            TAG_KEYS[1],
            if use_pretrained_values { "True" } else { "False" }
        ),
    ];
    format!("finetune__{}____{}", snapshot_parent, tags.join("__"))
}
