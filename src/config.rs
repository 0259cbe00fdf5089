use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::plasticity::models::{
    DamageModel,
    EquationOfState,
    ErosionAlgorithm,
    FlowStressModel,
    MeltingModel,
    PorosityModel,
    ShearModulusModel,
    StabilityCheck,
    YieldCondition,
};




/// Largest halo or ray extent, in cells, accepted by the index arithmetic
/// of the traversal engine.
pub const MAX_REGION_CELLS: i64 = i32::MAX as i64;




/**
 * Selects single-grid or multi-resolution ray tracing
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Trace rays on the level containing the patch only.
    SingleLevel,
    /// Trace from the finest level, coarsening as rays leave each level's
    /// region of interest.
    DataOnion,
    /// Trace on the coarsest level with coarsened properties and refine the
    /// result back to the finest level.
    CoarseLevel,
}




/**
 * How ray directions are drawn
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionSampling {
    Naive,
    LatinHyperCube,
}




/**
 * The fine-level region over which a patch's rays may use fine-level data
 * before coarsening, in the data onion algorithm.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionOfInterest {
    /// The patch extended by a fixed number of cells on each axis.
    PatchBased { halo_cells: [i64; 3] },
    /// The patch extended by a physical distance, rounded up to whole cells
    /// on each level.
    HaloLength { length: f64 },
    /// A fixed physical box, the same for every patch.
    BoundedBox { lo: [f64; 3], hi: [f64; 3] },
}




/**
 * Options for the RMCRT radiation solve.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RmcrtConfig {
    /// Rays per cell for the flux-divergence integration.
    pub n_div_q_rays: usize,
    /// Rays per boundary face for the incident boundary flux.
    pub n_flux_rays: usize,
    /// Intensity cutoff which stops per-ray accumulation.
    pub threshold: f64,
    /// `true` draws from a per-thread random stream; `false` seeds a
    /// generator deterministically from the cell and ray indexes.
    pub random_seed: bool,
    pub allow_reflect: bool,
    /// Scattering coefficient (1/m). Zero disables scattering.
    pub sigma_scat: f64,
    pub solve_div_q: bool,
    pub solve_boundary_flux: bool,
    /// Rays originate at cell centers rather than random in-cell points.
    pub cc_rays: bool,
    pub direction_sampling: DirectionSampling,
    pub algorithm: Algorithm,
    pub region_of_interest: RegionOfInterest,
    /// Rays longer than this (in meters) are terminated without a wall
    /// contribution.
    pub max_ray_length: f64,
    /// Per-axis periodic flags inherited from the grid setup.
    pub periodic: [bool; 3],
}




// ============================================================================
impl Default for RmcrtConfig {
    fn default() -> Self {
        Self {
            n_div_q_rays: 10,
            n_flux_rays: 1,
            threshold: 0.01,
            random_seed: false,
            allow_reflect: true,
            sigma_scat: 0.0,
            solve_div_q: true,
            solve_boundary_flux: false,
            cc_rays: false,
            direction_sampling: DirectionSampling::Naive,
            algorithm: Algorithm::SingleLevel,
            region_of_interest: RegionOfInterest::PatchBased { halo_cells: [10, 10, 10] },
            max_ray_length: f64::INFINITY,
            periodic: [false; 3],
        }
    }
}




// ============================================================================
impl RmcrtConfig {


    /**
     * Parse the options from a TOML document. Missing keys take their
     * default values; unknown keys are an error.
     */
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }


    /**
     * Check the options for combinations that cannot be run.
     */
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, reason: String| Err(Error::InvalidConfig { key: key.to_string(), reason });

        if let Some(axis) = self.periodic.iter().position(|&p| p) {
            return Err(Error::PeriodicBoundary { axis });
        }
        if self.solve_div_q && self.n_div_q_rays == 0 {
            return invalid("n_div_q_rays", "must be positive".to_string());
        }
        if self.solve_boundary_flux && self.n_flux_rays == 0 {
            return invalid("n_flux_rays", "must be positive".to_string());
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return invalid("threshold", format!("{} is not in (0, 1)", self.threshold));
        }
        if !(self.sigma_scat >= 0.0 && self.sigma_scat.is_finite()) {
            return invalid("sigma_scat", format!("{} must be finite and non-negative", self.sigma_scat));
        }
        if !(self.max_ray_length > 0.0) {
            return invalid("max_ray_length", format!("{} must be positive", self.max_ray_length));
        }
        match &self.region_of_interest {
            RegionOfInterest::PatchBased { halo_cells } => {
                if let Some(h) = halo_cells.iter().find(|&&h| h < 0) {
                    return invalid("halo_cells", format!("{} is negative", h));
                }
                if let Some(&h) = halo_cells.iter().find(|&&h| h > MAX_REGION_CELLS) {
                    return Err(Error::RegionTooLarge { what: "halo".to_string(), cells: h, limit: MAX_REGION_CELLS });
                }
            }
            RegionOfInterest::HaloLength { length } => {
                if !(*length >= 0.0 && length.is_finite()) {
                    return invalid("halo_length", format!("{} must be finite and non-negative", length));
                }
            }
            RegionOfInterest::BoundedBox { lo, hi } => {
                if (0..3).any(|n| !(lo[n] < hi[n])) {
                    return invalid("bounded_box", "lo must be below hi on every axis".to_string());
                }
            }
        }
        Ok(())
    }


    /**
     * Check that the physical extents implied by the options fit the index
     * arithmetic for a level with the given minimum cell spacing.
     */
    pub fn validate_extents(&self, min_dx: f64) -> Result<()> {
        let cells = |length: f64| (length / min_dx).ceil();

        if self.max_ray_length.is_finite() && cells(self.max_ray_length) > MAX_REGION_CELLS as f64 {
            return Err(Error::RegionTooLarge {
                what: "max_ray_length".to_string(),
                cells: cells(self.max_ray_length) as i64,
                limit: MAX_REGION_CELLS,
            });
        }
        if let RegionOfInterest::HaloLength { length } = self.region_of_interest {
            if cells(length) > MAX_REGION_CELLS as f64 {
                return Err(Error::RegionTooLarge {
                    what: "halo_length".to_string(),
                    cells: cells(length) as i64,
                    limit: MAX_REGION_CELLS,
                });
            }
        }
        Ok(())
    }
}




/**
 * Reference properties of the material, at the initial state.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialConstants {
    pub density: f64,
    pub bulk_modulus: f64,
    pub shear_modulus: f64,
    pub specific_heat: f64,
    pub melting_temperature: f64,
    pub initial_temperature: f64,
    /// Fraction of plastic work converted to heat.
    pub taylor_quinney: f64,
}




const REQUIRED_MATERIAL_KEYS: &[&str] = &[
    "density",
    "bulk_modulus",
    "shear_modulus",
    "specific_heat",
    "melting_temperature",
    "initial_temperature",
    "taylor_quinney",
];




/**
 * Options for the elastic-plastic stress update.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlasticityConfig {
    pub material: MaterialConstants,
    pub flow_stress: FlowStressModel,
    pub yield_condition: YieldCondition,
    pub shear_modulus: ShearModulusModel,
    pub melting: MeltingModel,
    pub eos: EquationOfState,
    pub damage: DamageModel,
    pub stability: StabilityCheck,
    pub porosity: PorosityModel,
    pub erosion: ErosionAlgorithm,
    /// Upper bound on the Newton tolerance; the step size is used when it is
    /// smaller.
    pub tolerance: f64,
    /// Zero the deviatoric stress of melted particles.
    pub zero_stress_on_melt: bool,
    /// Evaluate the localization criteria after plastic steps.
    pub check_failure: bool,
    /// Porosity at which a particle localizes, with zero damage.
    pub critical_porosity: f64,
    pub adiabatic_heating: bool,
    /// Factor applied to the step size when a timestep restart is requested.
    pub restart_reduction_factor: f64,
}




// ============================================================================
impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            density: 7830.0,
            bulk_modulus: 1.6e11,
            shear_modulus: 8.0e10,
            specific_heat: 477.0,
            melting_temperature: 1793.0,
            initial_temperature: 294.0,
            taylor_quinney: 0.9,
        }
    }
}

impl Default for PlasticityConfig {
    fn default() -> Self {
        Self {
            material: MaterialConstants::default(),
            flow_stress: FlowStressModel::LinearHardening { yield_stress: 3.0e8, hardening_modulus: 1.0e9 },
            yield_condition: YieldCondition::VonMises,
            shear_modulus: ShearModulusModel::Constant,
            melting: MeltingModel::Constant,
            eos: EquationOfState::Hypoelastic,
            damage: DamageModel::None,
            stability: StabilityCheck::None,
            porosity: PorosityModel::Constant,
            erosion: ErosionAlgorithm::None,
            tolerance: 1.0e-6,
            zero_stress_on_melt: true,
            check_failure: false,
            critical_porosity: 0.5,
            adiabatic_heating: false,
            restart_reduction_factor: 0.5,
        }
    }
}




// ============================================================================
impl PlasticityConfig {


    /**
     * Load the options from TOML. Model selections fall back to their
     * defaults, but every material constant must be given.
     */
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::Table = source.parse()?;
        let material = table
            .get("material")
            .and_then(toml::Value::as_table)
            .ok_or_else(|| Error::MissingConfig("material".to_string()))?;

        for key in REQUIRED_MATERIAL_KEYS {
            if !material.contains_key(*key) {
                return Err(Error::MissingConfig(format!("material.{}", key)));
            }
        }
        let config: Self = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }


    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, reason: String| Err(Error::InvalidConfig { key: key.to_string(), reason });
        let m = &self.material;

        for (key, value) in &[
            ("density", m.density),
            ("bulk_modulus", m.bulk_modulus),
            ("shear_modulus", m.shear_modulus),
            ("specific_heat", m.specific_heat),
            ("melting_temperature", m.melting_temperature),
        ] {
            if !(*value > 0.0 && value.is_finite()) {
                return invalid(key, format!("{} must be positive", value));
            }
        }
        if !(self.tolerance > 0.0) {
            return invalid("tolerance", format!("{} must be positive", self.tolerance));
        }
        if !(self.restart_reduction_factor > 0.0 && self.restart_reduction_factor < 1.0) {
            return invalid("restart_reduction_factor", format!("{} is not in (0, 1)", self.restart_reduction_factor));
        }
        if !(self.critical_porosity > 0.0 && self.critical_porosity <= 1.0) {
            return invalid("critical_porosity", format!("{} is not in (0, 1]", self.critical_porosity));
        }
        if !(0.0..=1.0).contains(&m.taylor_quinney) {
            return invalid("taylor_quinney", format!("{} is not in [0, 1]", m.taylor_quinney));
        }
        Ok(())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RmcrtConfig::default().validate().is_ok());
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = RmcrtConfig::from_toml_str(r#"
            n_div_q_rays = 100
            threshold = 0.05
            allow_reflect = false
            algorithm = "data_onion"
            direction_sampling = "latin_hyper_cube"

            [region_of_interest.patch_based]
            halo_cells = [4, 4, 4]
        "#).unwrap();

        assert_eq!(config.n_div_q_rays, 100);
        assert_eq!(config.algorithm, Algorithm::DataOnion);
        assert_eq!(config.direction_sampling, DirectionSampling::LatinHyperCube);
        assert_eq!(config.region_of_interest, RegionOfInterest::PatchBased { halo_cells: [4, 4, 4] });
        assert!(!config.allow_reflect);
        assert!(config.solve_div_q);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(RmcrtConfig::from_toml_str("nDivQRayz = 3"), Err(Error::Toml(_))));
    }

    #[test]
    fn periodic_boundaries_are_fatal() {
        let config = RmcrtConfig { periodic: [false, true, false], ..RmcrtConfig::default() };
        assert!(matches!(config.validate(), Err(Error::PeriodicBoundary { axis: 1 })));
    }

    #[test]
    fn threshold_must_be_a_fraction() {
        let config = RmcrtConfig { threshold: 1.5, ..RmcrtConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_halo_length_is_rejected() {
        let config = RmcrtConfig {
            region_of_interest: RegionOfInterest::HaloLength { length: 1.0e6 },
            ..RmcrtConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(matches!(config.validate_extents(1.0e-6), Err(Error::RegionTooLarge { .. })));
    }

    #[test]
    fn plasticity_models_load_from_toml() {
        let config = PlasticityConfig::from_toml_str(r#"
            check_failure = true
            erosion = "zero_stress"

            [material]
            density = 8930.0
            bulk_modulus = 1.3e11
            shear_modulus = 4.6e10
            specific_heat = 383.0
            melting_temperature = 1356.0
            initial_temperature = 294.0
            taylor_quinney = 0.9

            [flow_stress]
            type = "johnson_cook"
            a = 7.92e8
            b = 5.10e8
            c = 0.014
            n = 0.26
            m = 1.03
            reference_strain_rate = 1.0
            room_temperature = 294.0

            [yield_condition]
            type = "von_mises"
        "#).unwrap();

        assert!(matches!(config.flow_stress, FlowStressModel::JohnsonCook { .. }));
        assert_eq!(config.erosion, ErosionAlgorithm::ZeroStress);
        assert_eq!(config.material.density, 8930.0);
        assert_eq!(config.material.melting_temperature, 1356.0);
    }

    #[test]
    fn plasticity_material_constants_are_required() {
        assert!(matches!(
            PlasticityConfig::from_toml_str("check_failure = true"),
            Err(Error::MissingConfig(key)) if key == "material"));

        let missing_shear = PlasticityConfig::from_toml_str(r#"
            [material]
            density = 7830.0
            bulk_modulus = 1.6e11
        "#);
        assert!(matches!(missing_shear, Err(Error::MissingConfig(key)) if key == "material.shear_modulus"));
    }

    #[test]
    fn plasticity_reduction_factor_must_shrink_the_step() {
        let config = PlasticityConfig { restart_reduction_factor: 1.5, ..PlasticityConfig::default() };
        assert!(config.validate().is_err());
        assert!(PlasticityConfig::default().validate().is_ok());
    }
}
