// Ready-made designs

use crate::entities::{mooring, naval, structure, BoxStructure, MooringSystem, NavalModel};
use crate::parameters::ParameterSet;
use crate::units::{Quantity, Unit};
use anyhow::Result;

/// Catenary mooring with anchors at 100 m
pub fn catenary_design() -> Result<ParameterSet> {
    Ok(mooring::schema()
        .builder()
        .set("AnchorRadius", Quantity::meters(100.0))
        .build()?)
}

/// Three bundles of four lines, one degree apart within a bundle
pub fn catenary_3x4_design() -> Result<ParameterSet> {
    let schema = mooring::schema();
    Ok(schema
        .builder()
        .set("AnchorRadius", Quantity::meters(100.0))
        .set("NumberOfBundles", Quantity::dimensionless(3.0))
        .set("NumberOfLinesPerBundle", Quantity::dimensionless(4.0))
        .set("BundleSpread", Quantity::new(1.0, Unit::Degree))
        .build()?)
}

/// Catenary design with the anchor radius used for the Newcastle site
pub fn newcastle_offshore_wind() -> Result<MooringSystem> {
    let schema = mooring::schema();
    let design = catenary_design()?;
    let params = crate::parameters::ParameterSetBuilder::from_set(&schema, &design)
        .set("AnchorRadius", Quantity::meters(200.0))
        .build()?;

    MooringSystem::new("Newcastle Offshore Wind", params)
}

/// 100 x 40 x 40 m box hull
pub fn my_design() -> Result<ParameterSet> {
    Ok(structure::schema().defaults()?)
}

/// The box hull afloat with default water properties
pub fn my_naval() -> Result<NavalModel<BoxStructure>> {
    let hull = BoxStructure::new("MyStructure", my_design()?)?;
    NavalModel::new("MyNaval", naval::schema().defaults()?, hull)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[test]
    fn test_catenary_design() {
        let design = catenary_design().unwrap();
        assert_eq!(design.si("AnchorRadius").unwrap(), 100.0);
        assert_eq!(design.si("WaterDepth").unwrap(), 100.0);
    }

    #[test]
    fn test_catenary_3x4_layout() {
        let ms = MooringSystem::new("3x4", catenary_3x4_design().unwrap()).unwrap();
        let lines = ms.line_layout().unwrap();

        assert_eq!(lines.len(), 12);
        let spread = lines[1].heading_deg() - lines[0].heading_deg();
        assert!((spread - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_newcastle_offshore_wind() {
        let ms = newcastle_offshore_wind().unwrap();

        assert_eq!(ms.name(), "Newcastle Offshore Wind");
        assert_eq!(ms.parameters().si("AnchorRadius").unwrap(), 200.0);
        assert_eq!(ms.state_name(), "InSitu");
    }

    #[test]
    fn test_my_naval_exposes_structure_parameters() {
        let nav = my_naval().unwrap();
        let params = nav.structure().parameters();

        assert_eq!(params.si("Length").unwrap(), 100.0);
        assert_eq!(params.si("Width").unwrap(), 40.0);
        assert_eq!(params.si("Depth").unwrap(), 40.0);
    }
}
