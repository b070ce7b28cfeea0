use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde::{Deserialize, Serialize};
use vrcal_core::{DistanceStats, Iso3, Mat4, PointPairs, PointTransform, Real, ScaledRigid};
use vrcal_optim::{fit_projective, fit_rigid, fit_scaled_rigid, FitOptions, FitReport, Termination};

/// Transform family to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Model {
    Rigid,
    ScaledRigid,
    Projective,
}

impl Model {
    fn name(self) -> &'static str {
        match self {
            Model::Rigid => "rigid",
            Model::ScaledRigid => "scaled-rigid",
            Model::Projective => "projective",
        }
    }
}

/// Fit a transform between matched 3D point sets.
#[derive(Debug, Parser)]
#[command(author, version, about = "Point-set transform fitting")]
struct Args {
    /// Path to JSON file containing PointPairs (`source` and `target` arrays).
    #[arg(long)]
    input: String,

    /// Transform family to fit.
    #[arg(long, value_enum, default_value_t = Model::Rigid)]
    model: Model,

    /// Optional path to JSON FitOptions. Defaults are used if omitted.
    #[arg(long)]
    config: Option<String>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    output: Option<String>,
}

/// JSON report written by `vrcal-fit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FitSummary {
    model: String,
    /// Homogeneous 4×4 matrix, row-major.
    matrix: [[Real; 4]; 4],
    #[serde(skip_serializing_if = "Option::is_none", default)]
    translation: Option<[Real; 3]>,
    /// Unit quaternion as `[i, j, k, w]`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    rotation: Option<[Real; 4]>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    scale: Option<[Real; 2]>,
    cost: Real,
    stats: DistanceStats,
    termination: Termination,
    iterations: usize,
    accepted_steps: usize,
    attempts: usize,
}

impl FitSummary {
    fn from_report<T: PointTransform>(model: Model, report: &FitReport<T>) -> Self {
        let m: Mat4 = report.transform.to_matrix();
        let mut matrix = [[0.0; 4]; 4];
        for (r, row) in matrix.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = m[(r, c)];
            }
        }
        Self {
            model: model.name().to_string(),
            matrix,
            translation: None,
            rotation: None,
            scale: None,
            cost: report.cost,
            stats: report.stats,
            termination: report.lm.termination,
            iterations: report.lm.iterations,
            accepted_steps: report.lm.accepted_steps,
            attempts: report.attempts,
        }
    }

    fn with_rigid_parts(mut self, iso: &Iso3) -> Self {
        let t = iso.translation.vector;
        let q = iso.rotation.coords;
        self.translation = Some([t.x, t.y, t.z]);
        self.rotation = Some([q[0], q[1], q[2], q[3]]);
        self
    }

    fn with_scaled_rigid_parts(self, transform: &ScaledRigid) -> Self {
        let mut summary = self.with_rigid_parts(&transform.isometry());
        summary.scale = Some([transform.scale.x, transform.scale.y]);
        summary
    }
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(value)
}

fn fit_from_files(input_path: &str, model: Model, config_path: Option<&str>) -> Result<String> {
    let pairs: PointPairs = load_json_file(Path::new(input_path))?;
    pairs.validate()?;

    let options = if let Some(cfg_path) = config_path {
        load_json_file::<FitOptions>(Path::new(cfg_path))?
    } else {
        FitOptions::default()
    };
    info!("fitting {} model to {} point pairs", model.name(), pairs.len());

    let summary = match model {
        Model::Rigid => {
            let report = fit_rigid(&pairs.source, &pairs.target, &options)?;
            FitSummary::from_report(model, &report).with_rigid_parts(&report.transform)
        }
        Model::ScaledRigid => {
            let report = fit_scaled_rigid(&pairs.source, &pairs.target, &options)?;
            FitSummary::from_report(model, &report).with_scaled_rigid_parts(&report.transform)
        }
        Model::Projective => {
            let report = fit_projective(&pairs.source, &pairs.target, &options)?;
            FitSummary::from_report(model, &report)
        }
    };
    info!(
        "{:?} after {} iterations, rms distance {:.3e}",
        summary.termination, summary.iterations, summary.stats.rms
    );
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn main() {
    pretty_env_logger::init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let json = fit_from_files(&args.input, args.model, args.config.as_deref())?;
    match args.output {
        Some(path) => fs::write(&path, json).with_context(|| format!("failed to write {path}"))?,
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Translation3;
    use std::{fs, path::Path};
    use tempfile::NamedTempFile;
    use vrcal_core::{synthetic::points, Rot3, Vec2, Vec3};

    fn write_json<T: Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    fn run(pairs: &PointPairs, model: Model, options: Option<&FitOptions>) -> FitSummary {
        let input_file = NamedTempFile::new().unwrap();
        write_json(pairs, input_file.path());
        let config_file = NamedTempFile::new().unwrap();
        let config_path = options.map(|opts| {
            write_json(opts, config_file.path());
            config_file.path().to_str().unwrap().to_string()
        });

        let json = fit_from_files(
            input_file.path().to_str().unwrap(),
            model,
            config_path.as_deref(),
        )
        .expect("cli helper should succeed");
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn rigid_smoke_test() {
        let truth = Iso3::from_parts(
            Translation3::new(0.1, 0.2, 0.3),
            Rot3::from_euler_angles(0.05, -0.1, 0.2),
        );
        let pairs =
            points::pairs_from_transform(&points::grid_points_3d(3, 3, 3, 0.2), &truth).unwrap();

        let summary = run(&pairs, Model::Rigid, None);
        assert_eq!(summary.model, "rigid");
        assert!(summary.cost < 1e-10, "final cost too high: {}", summary.cost);
        let t = summary.translation.unwrap();
        assert!((t[2] - 0.3).abs() < 1e-6, "translation {:?}", t);
        assert!((summary.matrix[0][3] - 0.1).abs() < 1e-6);
        assert_eq!(summary.matrix[3], [0.0, 0.0, 0.0, 1.0]);
        assert!(summary.scale.is_none());
    }

    #[test]
    fn scaled_rigid_reports_scale() {
        let truth = ScaledRigid::new(
            Vec3::new(-0.4, 0.0, 1.0),
            Rot3::from_euler_angles(0.0, 0.1, 0.3),
            Vec2::new(1.25, 0.9),
        );
        let pairs =
            points::pairs_from_transform(&points::grid_points_3d(4, 3, 2, 0.25), &truth).unwrap();

        let options = FitOptions {
            restarts: 1,
            ..FitOptions::default()
        };
        let summary = run(&pairs, Model::ScaledRigid, Some(&options));
        let scale = summary.scale.unwrap();
        assert!((scale[0] - 1.25).abs() < 1e-6, "scale {:?}", scale);
        assert!((scale[1] - 0.9).abs() < 1e-6, "scale {:?}", scale);
        assert_eq!(summary.attempts, 2);
    }

    #[test]
    fn projective_report_has_unit_corner() {
        let pairs = points::pairs_from_transform(
            &points::random_points(12, 1.0, 9),
            &Iso3::translation(0.0, 0.5, -0.5),
        )
        .unwrap();
        let summary = run(&pairs, Model::Projective, None);
        assert_eq!(summary.model, "projective");
        assert_eq!(summary.matrix[3][3], 1.0);
        assert!(summary.stats.max < 1e-6, "max {}", summary.stats.max);
        assert!(summary.rotation.is_none());
    }

    #[test]
    fn mismatched_input_is_an_error() {
        let input_file = NamedTempFile::new().unwrap();
        fs::write(
            input_file.path(),
            r#"{ "source": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], "target": [[0.0, 0.0, 0.0]] }"#,
        )
        .unwrap();
        let result = fit_from_files(input_file.path().to_str().unwrap(), Model::Rigid, None);
        assert!(result.is_err());
    }
}
