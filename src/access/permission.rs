//! Which components may perform which operations

use serde::Serialize;

use crate::core::error::ErrorKind;
use crate::core::types::*;

/// A class of component an operation accepts as its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    AnyGlobal,
    AllRegions,
    AllCompartments,
    AllProducers,
    Region(RegionId),
    Compartment(CompartmentId),
    Producer(MaterialsProducerId),
}

impl Scope {
    pub fn admits(&self, component: &ComponentRef) -> bool {
        match (self, component) {
            (Scope::AnyGlobal, ComponentRef::Global(_)) => true,
            (Scope::AllRegions, ComponentRef::Region(_)) => true,
            (Scope::AllCompartments, ComponentRef::Compartment(_)) => true,
            (Scope::AllProducers, ComponentRef::MaterialsProducer(_)) => true,
            (Scope::Region(wanted), ComponentRef::Region(region)) => wanted == region,
            (Scope::Compartment(wanted), ComponentRef::Compartment(compartment)) => {
                wanted == compartment
            }
            (Scope::Producer(wanted), ComponentRef::MaterialsProducer(producer)) => {
                wanted == producer
            }
            _ => false,
        }
    }
}

/// Every component kind
pub const ANY_COMPONENT: &[Scope] = &[
    Scope::AnyGlobal,
    Scope::AllRegions,
    Scope::AllCompartments,
    Scope::AllProducers,
];

pub const GLOBAL_ONLY: &[Scope] = &[Scope::AnyGlobal];

/// Components allowed to move people around and edit person state
pub const PERSON_EDITORS: &[Scope] = &[
    Scope::AnyGlobal,
    Scope::AllRegions,
    Scope::AllCompartments,
];

/// The simulation is always authorized; "no component" never is
pub fn authorize(focus: &Focus, acceptable: &[Scope]) -> Result<(), ErrorKind> {
    match focus {
        Focus::Simulation => Ok(()),
        Focus::Component(component) if acceptable.iter().any(|scope| scope.admits(component)) => {
            Ok(())
        }
        _ => Err(ErrorKind::Unauthorized {
            acceptable: acceptable.to_vec(),
        }),
    }
}

/// Global components plus the one producer named
pub fn producer_or_global(producer: MaterialsProducerId) -> [Scope; 2] {
    [Scope::AnyGlobal, Scope::Producer(producer)]
}

/// Global components plus the one region named
pub fn region_or_global(region: RegionId) -> [Scope; 2] {
    [Scope::AnyGlobal, Scope::Region(region)]
}

pub fn compartment_or_global(compartment: CompartmentId) -> [Scope; 2] {
    [Scope::AnyGlobal, Scope::Compartment(compartment)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> Focus {
        Focus::Component(ComponentRef::Global(ComponentId::from("g")))
    }

    #[test]
    fn test_simulation_always_authorized() {
        assert!(authorize(&Focus::Simulation, &[]).is_ok());
    }

    #[test]
    fn test_no_component_never_authorized() {
        assert_eq!(
            authorize(&Focus::None, ANY_COMPONENT).unwrap_err(),
            ErrorKind::Unauthorized {
                acceptable: ANY_COMPONENT.to_vec()
            }
        );
    }

    #[test]
    fn test_specific_scopes() {
        let region = Focus::Component(ComponentRef::Region(RegionId(1)));
        assert!(authorize(&region, &region_or_global(RegionId(1))).is_ok());
        assert!(authorize(&region, &region_or_global(RegionId(2))).is_err());
        assert!(authorize(&global(), &region_or_global(RegionId(2))).is_ok());

        let producer = Focus::Component(ComponentRef::MaterialsProducer(MaterialsProducerId(4)));
        assert!(authorize(&producer, &producer_or_global(MaterialsProducerId(4))).is_ok());
        assert!(authorize(&producer, GLOBAL_ONLY).is_err());
        assert!(authorize(&producer, PERSON_EDITORS).is_err());
        assert!(authorize(&producer, ANY_COMPONENT).is_ok());
    }

    #[test]
    fn test_failure_lists_acceptable_scopes() {
        let compartment = Focus::Component(ComponentRef::Compartment(CompartmentId(3)));
        let err = authorize(&compartment, &region_or_global(RegionId(1))).unwrap_err();
        assert_eq!(
            err,
            ErrorKind::Unauthorized {
                acceptable: vec![Scope::AnyGlobal, Scope::Region(RegionId(1))]
            }
        );
    }
}
