//! Run configuration (§6 "Configuration flags"). Mirrors the original tool's
//! module-level defaults as one struct instead of scattered globals.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopoProduct {
    Topo10,
    Topo50,
    Topo100,
    Topo250,
}

impl TopoProduct {
    pub fn grid_size(&self) -> f64 {
        match self {
            TopoProduct::Topo250 => 100_000.0,
            _ => 10_000.0,
        }
    }

    pub fn max_combine_members(&self) -> usize {
        match self {
            TopoProduct::Topo250 => 4,
            _ => 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataCategory {
    Anlaggningsomrade,
    Byggnadsverk,
    Hojd,
    Hydrografi,
    Kommunikation,
    Ledningar,
    Mark,
    Militartomrade,
    Naturvard,
    Norrapolcirkeln,
    Text,
    Topo,
}

/// `name:<lang>` key construction (§6 "language-code mapping").
pub fn language_code(source_code: &str) -> Option<&'static str> {
    Some(match source_code {
        "SV" => "sv",
        "TF" => "fit",
        "FI" => "fi",
        "NS" => "se",
        "LS" => "smj",
        "US" => "sju",
        "SS" => "sma",
        _ => return None,
    })
}

#[derive(Clone, Debug)]
pub struct Config {
    pub topo_product: TopoProduct,
    pub data_category: DataCategory,

    pub debug: bool,
    pub topo_tags: bool,
    pub json_output: bool,
    pub get_name: bool,
    pub get_hydrografi: bool,
    pub get_topo_rivers: bool,
    pub load_landcover: bool,
    pub merge_node: bool,
    pub merge_grid: bool,
    pub merge_wetland: bool,
    pub simplify: bool,
    pub add_sea_names: bool,
    pub add_bay_names: bool,

    pub precision: u32,
    pub island_size: f64,
    pub simplify_factor: f64,
}

impl Config {
    pub fn grid_size(&self) -> f64 {
        self.topo_product.grid_size()
    }

    pub fn max_combine_members(&self) -> usize {
        self.topo_product.max_combine_members()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topo_product: TopoProduct::Topo10,
            data_category: DataCategory::Topo,
            debug: false,
            topo_tags: false,
            json_output: false,
            get_name: true,
            get_hydrografi: true,
            get_topo_rivers: true,
            load_landcover: false,
            merge_node: true,
            merge_grid: true,
            merge_wetland: true,
            simplify: true,
            add_sea_names: false,
            add_bay_names: false,
            precision: 7,
            island_size: 100_000.0,
            simplify_factor: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo250_uses_the_100km_grid() {
        assert_eq!(TopoProduct::Topo250.grid_size(), 100_000.0);
        assert_eq!(TopoProduct::Topo10.grid_size(), 10_000.0);
    }

    #[test]
    fn language_code_maps_known_sources_only() {
        assert_eq!(language_code("FI"), Some("fi"));
        assert_eq!(language_code("XX"), None);
    }
}
