//! Descriptions of the variables a circulation model writes
//!
//! A read-only, process-wide registry: name, long name, CF standard name,
//! units and component convention for each output variable. Entries with
//! two or three variables describe vectors, or a maximum paired with the
//! time it occurred.

use serde::Serialize;

/// Convention for scalar quantities
pub const DEFAULT_CONVENTION: &str = "default";

/// One output variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: &'static str,
    pub long_name: &'static str,
    pub standard_name: &'static str,
    pub units: &'static str,
    /// Component direction (`east`, `north`, `up`) or [`DEFAULT_CONVENTION`]
    pub convention: &'static str,
}

/// An output file's variable set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputMetadata {
    pub variables: &'static [Variable],
    /// Extremum output (with the time it occurred as second variable)
    pub is_max: bool,
    /// Variables are components of one vector
    pub is_vector: bool,
}

impl OutputMetadata {
    /// Number of variables in the entry
    pub fn dimension(&self) -> usize {
        self.variables.len()
    }

    /// Primary variable
    pub fn primary(&self) -> &'static Variable {
        &self.variables[0]
    }

    pub fn variable(&self, index: usize) -> Option<&'static Variable> {
        self.variables.get(index)
    }

    /// Whether any variable of this entry has the given name
    pub fn contains(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }
}

/// Entry whose variables include `name`
pub fn find(name: &str) -> Option<&'static OutputMetadata> {
    OUTPUT_METADATA.iter().find(|m| m.contains(name))
}

/// Every known output entry
pub fn registry() -> &'static [OutputMetadata] {
    OUTPUT_METADATA
}

macro_rules! entry {
    ($max:expr, $vector:expr; $( ($n:expr, $l:expr, $s:expr, $u:expr, $c:expr) ),+ $(,)?) => {
        OutputMetadata {
            variables: &[ $( Variable {
                name: $n,
                long_name: $l,
                standard_name: $s,
                units: $u,
                convention: $c,
            } ),+ ],
            is_max: $max,
            is_vector: $vector,
        }
    };
}

const D: &str = DEFAULT_CONVENTION;

#[rustfmt::skip]
static OUTPUT_METADATA: &[OutputMetadata] = &[
    entry!(false, false;
        ("sigmat", "water column vertically varying density", "water_density_vertically_varying", "kg/m^3", D),
        ("salinity", "water column vertically varying salinity", "water_salinity_vertically_varying", "psu", D),
        ("temperature", "water column vertically varying temperature", "water_temperature_vertically_varying", "Celsius", D),
    ),
    entry!(false, true;
        ("u-vel3D", "water column vertically varying east/west velocity", "eastward_water_velocity_vertically_varying", "m/s", "east"),
        ("v-vel3D", "water column vertically varying north/south velocity", "northward_water_velocity_vertically_varying", "m/s", "north"),
        ("w-vel3D", "water column vertically varying up/down velocity", "upward_water_velocity_vertically_varying", "m/s", "up"),
    ),
    entry!(false, false;
        ("q20", "water column vertically varying turbulent kinetic energy", "turbulent_kinetic_energy_vertically_varying", "m s-2", D),
        ("l", "water column vertically varying mixing length", "water_mixing_length_vertically_varying", "m", D),
        ("ev", "water column vertically varying eddy viscosity", "water_eddy_viscosity_vertically_varying", "m^2/s", D),
    ),
    entry!(false, false;
        ("qsurfkp1", "sea surface temperature at the k+1 time level", "future sea surface temperature", "Celsius", D),
    ),
    entry!(false, false;
        ("zeta", "water surface elevation above geoid", "sea_surface_height_above_geoid", "m", D),
    ),
    entry!(false, false;
        ("tau0", "primitive weighting in continuity equation", "primitive_weighting_in_continuity_equation", "1", D),
    ),
    entry!(true, false;
        ("zeta_max", "maximum water surface elevation", "maximum_sea_surface_height_above_geoid", "m", D),
        ("time_of_zeta_max", "time of maximum water surface elevation above geoid", "time_of_maximum_sea_surface_height_above_geoid", "sec", D),
    ),
    entry!(false, true;
        ("u-vel", "water column vertically averaged east/west velocity", "eastward_water_velocity", "m/s", "east"),
        ("v-vel", "water column vertically averaged north/south velocity", "northward_water_velocity", "m/s", "north"),
    ),
    entry!(true, false;
        ("vel_max", "maximum water column vertically averaged velocity", "maximum_water_velocity", "m/s", D),
        ("time_of_vel_max", "time of maximum water column vertically averaged velocity", "time_of_maximum_water_velocity", "sec", D),
    ),
    entry!(false, false;
        ("winddrag", "wind drag coefficient at sea level", "wind drag coefficient", "unitless", D),
    ),
    entry!(false, false;
        ("pressure", "air pressure at sea level", "air_pressure_at_sea_level", "mH20", D),
    ),
    entry!(true, false;
        ("pressure_min", "minimum air pressure at sea level", "minimum_air_pressure_at_sea_level", "mH20", D),
        ("time_of_pressure_min", "time of minimum air pressure at sea level", "time_of_minimum_air_pressure_at_sea_level", "sec", D),
    ),
    entry!(false, true;
        ("windx", "e/w wind velocity", "eastward_wind", "m/s", "east"),
        ("windy", "n/s wind velocity", "northward_wind", "m/s", "north"),
    ),
    entry!(true, false;
        ("wind_max", "maximum wind velocity", "maximum_wind", "m/s", D),
        ("time_of_wind_max", "time of maximum wind velocity", "time_of_maximum_wind", "sec", D),
    ),
    entry!(true, false;
        ("radstress_max", "maximum radiation stress gradient", "maximum_radiation_stress", "m-2 s-2", D),
        ("time_of_radstress_max", "time of maximum radiation stress gradient", "time_of_maximum_radiation_stress", "sec", D),
    ),
    entry!(false, false;
        ("weir_dz", "elevation change in weir boundary condition", "weir_elevation_change", "m", D),
    ),
    entry!(false, true;
        ("radstress_x", "radiation stress gradient x component", "radiation_stress_gradient_x", "m-2 s-2", "east"),
        ("radstress_y", "radiation stress gradient y component", "radiation_stress_gradient_y", "m-2 s-2", "north"),
    ),
    entry!(false, false;
        ("swan_HS", "significant wave height", "sea_surface_wave_significant_height", "m", D),
    ),
    entry!(true, false;
        ("swan_HS_max", "maximum significant wave height", "maximum_sea_surface_wave_significant_height", "m", D),
    ),
    entry!(false, false;
        ("swan_DIR", "mean wave direction", "sea_surface_wave_to_direction", "degrees", "degrees_CW_from_East"),
    ),
    entry!(true, false;
        ("swan_DIR_max", "maximum mean wave direction", "maximum_sea_surface_wave_to_direction", "degrees", "degrees_CW_from_East"),
    ),
    entry!(false, false;
        ("swan_TM01", "mean absolute wave period", "sea_surface_wave_mean_period_from_variance_spectral_density_first_frequency_moment", "s", D),
    ),
    entry!(true, false;
        ("swan_TM01_max", "maximum TM01 mean wave period", "maximum_sea_surface_wave_mean_period_from_variance_spectral_density_first_frequency_moment", "s", D),
    ),
    entry!(false, false;
        ("swan_TPS", "smoothed peak period", "sea_surface_wave_period_at_variance_spectral_density_maximum", "s", D),
    ),
    entry!(true, false;
        ("swan_TPS_max", "maximum smoothed peak period", "maximum_sea_surface_wave_period_at_variance_spectral_density_maximum", "s", D),
    ),
    entry!(false, true;
        ("swan_windx", "e/w wind velocity", "eastward_wind", "m/s", "east"),
        ("swan_windy", "n/s wind velocity", "northward_wind", "m/s", "north"),
    ),
    entry!(true, false;
        ("swan_wind_max", "maximum wind velocity", "maximum_wind", "m/s", D),
    ),
    entry!(false, false;
        ("swan_TM02", "mean absolute zero crossing period", "sea_surface_wave_mean_period_from_variance_spectral_density_second_frequency_moment", "s", D),
    ),
    entry!(true, false;
        ("swan_TM02_max", "maximum TM02 mean wave period", "maximum_sea_surface_wave_mean_period_from_variance_spectral_density_second_frequency_moment", "s", D),
    ),
    entry!(false, false;
        ("swan_TMM10", "mean absolute wave period", "sea_surface_wave_mean_period_from_variance_spectral_density_inverse_frequency_moment", "s", D),
    ),
    entry!(true, false;
        ("swan_TMM10_max", "maximum TMM10 mean wave period", "maximum_sea_surface_wave_mean_period_from_variance_spectral_density_inverse_frequency_moment", "s", D),
    ),
    entry!(false, false;
        ("inun_time", "total time of inundation beyond the threshold", "total_time_of_inundation_beyond_the_threshold", "s", D),
        ("onset_inun_time", "time of onset of inundation beyond the threshold", "time_of_onset_of_inundation_beyond_the_threshold", "s", D),
    ),
    entry!(false, false;
        ("inun_max", "maximum water inundation depth", "maximum_water_inundation_depth", "m", D),
        ("time_of_inun_max", "time of maximum water inundation depth", "time_of_maximum_water_inundation_depth", "s", D),
    ),
    entry!(false, false;
        ("initiallydry", "dry nodes at cold start", "initially_dry", "none", D),
    ),
    entry!(false, false;
        ("endrisinginun", "rising inundation at the end of the simulation", "end_rising_inundation", "none", D),
    ),
    entry!(false, false;
        ("everdried", "ever dried", "ever_dried", "none", D),
        ("time_of_everdried", "time of most recent drying occurrence", "time_of_most_recent_drying_occurrence", "s", D),
    ),
    entry!(false, false;
        ("offset", "water surface offset above dynamic water level", "sea_surface_offset_above_dynamic_water_level", "m", D),
    ),
];
