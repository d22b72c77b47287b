//! Shape-spec v0 parsing + compilation into specfit shapes.
//!
//! A spec document declares one observable (bounds plus optional named fit
//! ranges) and a list of shapes with initial parameter values. Compilation
//! produces boxed [`ShapePdf`] instances and the initial parameter vectors
//! the fitting engine takes ownership of.

#![allow(missing_docs)]

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::pdf::{
    BifurcatedCrystalBallPdf, CrystalBallPdf, DoubleSidedCrystalBallPdf, ExponentialTurnOnPdf,
    Range, ShapePdf,
};

pub const SHAPE_SPEC_V0: &str = "specfit_shape_spec_v0";

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeSpecV0 {
    #[serde(rename = "$schema")]
    #[allow(dead_code)]
    pub schema_uri: Option<String>,
    pub schema_version: String,
    pub observable: ObservableSpecV0,
    pub shapes: Vec<ShapeDefSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservableSpecV0 {
    pub name: String,
    pub bounds: [f64; 2],
    /// Named sub-ranges of the observable domain (e.g. sidebands, signal window).
    #[serde(default)]
    pub ranges: HashMap<String, [f64; 2]>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDefSpec {
    CrystalBall { name: String, x0: f64, sigma: f64, alpha: f64, n: f64 },
    DoubleSidedCrystalBall {
        name: String,
        x0: f64,
        sigma: f64,
        alpha_low: f64,
        n_low: f64,
        alpha_high: f64,
        n_high: f64,
    },
    BifurcatedCrystalBall {
        name: String,
        x0: f64,
        sigma_left: f64,
        sigma_right: f64,
        alpha_left: f64,
        n_left: f64,
        alpha_right: f64,
        n_right: f64,
    },
    ExponentialTurnOn { name: String, midpoint: f64, steepness: f64, slope: f64 },
}

impl ShapeDefSpec {
    pub fn name(&self) -> &str {
        match self {
            ShapeDefSpec::CrystalBall { name, .. }
            | ShapeDefSpec::DoubleSidedCrystalBall { name, .. }
            | ShapeDefSpec::BifurcatedCrystalBall { name, .. }
            | ShapeDefSpec::ExponentialTurnOn { name, .. } => name,
        }
    }
}

/// One compiled shape: the PDF plus the initial parameter vector the engine
/// takes ownership of.
pub struct CompiledShape {
    pub name: String,
    pub pdf: Box<dyn ShapePdf>,
    pub init_params: Vec<f64>,
}

/// Compiled spec: observable domain, named ranges, shapes.
pub struct CompiledShapeSet {
    pub observable: String,
    pub domain: Range,
    ranges: HashMap<String, Range>,
    pub shapes: Vec<CompiledShape>,
}

impl CompiledShapeSet {
    /// Resolve a named range; `"full"` is always the observable domain.
    pub fn range(&self, name: &str) -> Option<Range> {
        if name == "full" {
            return Some(self.domain);
        }
        self.ranges.get(name).copied()
    }
}

pub fn parse_spec_str(json: &str) -> Result<ShapeSpecV0> {
    let spec: ShapeSpecV0 =
        serde_json::from_str(json).context("parsing shape spec JSON")?;
    Ok(spec)
}

pub fn parse_spec_path(path: &Path) -> Result<ShapeSpecV0> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading shape spec {}", path.display()))?;
    parse_spec_str(&text)
}

/// Compile a parsed spec into shapes + initial parameter vectors.
pub fn compile(spec: &ShapeSpecV0) -> Result<CompiledShapeSet> {
    if spec.schema_version != SHAPE_SPEC_V0 {
        bail!(
            "unsupported schema_version '{}' (expected '{SHAPE_SPEC_V0}')",
            spec.schema_version
        );
    }

    let [lo, hi] = spec.observable.bounds;
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        bail!("observable '{}': invalid bounds ({lo}, {hi})", spec.observable.name);
    }
    let domain = Range::new(lo, hi);

    let mut ranges = HashMap::new();
    for (name, &[rlo, rhi]) in &spec.observable.ranges {
        if !rlo.is_finite() || !rhi.is_finite() || rlo >= rhi {
            bail!("range '{name}': invalid bounds ({rlo}, {rhi})");
        }
        if rlo < lo || rhi > hi {
            bail!("range '{name}': ({rlo}, {rhi}) outside observable domain ({lo}, {hi})");
        }
        ranges.insert(name.clone(), Range::new(rlo, rhi));
    }

    let obs = spec.observable.name.clone();
    let mut seen = HashSet::new();
    let mut shapes = Vec::with_capacity(spec.shapes.len());
    for def in &spec.shapes {
        if !seen.insert(def.name().to_string()) {
            bail!("duplicate shape name '{}'", def.name());
        }
        let (pdf, init_params): (Box<dyn ShapePdf>, Vec<f64>) = match *def {
            ShapeDefSpec::CrystalBall { x0, sigma, alpha, n, .. } => {
                warn_negative(def.name(), &[("sigma", sigma), ("alpha", alpha), ("n", n)]);
                (Box::new(CrystalBallPdf::new(&obs)), vec![x0, sigma, alpha, n])
            }
            ShapeDefSpec::DoubleSidedCrystalBall {
                x0,
                sigma,
                alpha_low,
                n_low,
                alpha_high,
                n_high,
                ..
            } => {
                warn_negative(
                    def.name(),
                    &[
                        ("sigma", sigma),
                        ("alpha_low", alpha_low),
                        ("n_low", n_low),
                        ("alpha_high", alpha_high),
                        ("n_high", n_high),
                    ],
                );
                (
                    Box::new(DoubleSidedCrystalBallPdf::new(&obs)),
                    vec![x0, sigma, alpha_low, n_low, alpha_high, n_high],
                )
            }
            ShapeDefSpec::BifurcatedCrystalBall {
                x0,
                sigma_left,
                sigma_right,
                alpha_left,
                n_left,
                alpha_right,
                n_right,
                ..
            } => {
                // alpha_left keeps its raw sign: it doubles as the tail side
                // selector.
                warn_negative(
                    def.name(),
                    &[
                        ("sigma_left", sigma_left),
                        ("sigma_right", sigma_right),
                        ("n_left", n_left),
                        ("alpha_right", alpha_right),
                        ("n_right", n_right),
                    ],
                );
                (
                    Box::new(BifurcatedCrystalBallPdf::new(&obs)),
                    vec![x0, sigma_left, sigma_right, alpha_left, n_left, alpha_right, n_right],
                )
            }
            ShapeDefSpec::ExponentialTurnOn { midpoint, steepness, slope, .. } => {
                if steepness <= 0.0 {
                    bail!("shape '{}': steepness must be > 0, got {steepness}", def.name());
                }
                (Box::new(ExponentialTurnOnPdf::new(&obs)), vec![midpoint, steepness, slope])
            }
        };
        let n_expected = pdf.n_params();
        debug_assert_eq!(init_params.len(), n_expected);
        shapes.push(CompiledShape { name: def.name().to_string(), pdf, init_params });
    }

    Ok(CompiledShapeSet { observable: obs, domain, ranges, shapes })
}

/// Negative initial widths/orders are accepted (shapes fold them by absolute
/// value) but usually indicate a config typo; flag them once at compile time.
fn warn_negative(shape: &str, params: &[(&str, f64)]) {
    for &(label, v) in params {
        if v < 0.0 {
            log::warn!("shape '{shape}': initial {label} = {v} is negative; the shape uses |{label}|");
        }
    }
}
