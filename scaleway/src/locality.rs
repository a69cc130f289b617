//! Regions, zones and the locality a resource lives in

use std::fmt;
use std::str::FromStr;

use crate::ids::IdError;

/// Scaleway region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    FrPar,
    NlAms,
    PlWaw,
    ItMil,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::FrPar, Region::NlAms, Region::PlWaw, Region::ItMil];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::FrPar => "fr-par",
            Region::NlAms => "nl-ams",
            Region::PlWaw => "pl-waw",
            Region::ItMil => "it-mil",
        }
    }

    /// Zones available in the region
    pub fn zones(&self) -> &'static [u8] {
        match self {
            Region::FrPar | Region::NlAms | Region::PlWaw => &[1, 2, 3],
            Region::ItMil => &[1],
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| IdError::InvalidID(format!("unknown region {:?}", s)))
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.as_str().to_string()
    }
}

/// A region plus a numeric suffix, e.g. `fr-par-1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone {
    pub region: Region,
    pub number: u8,
}

impl Zone {
    pub fn new(region: Region, number: u8) -> Result<Self, IdError> {
        if !region.zones().contains(&number) {
            return Err(IdError::InvalidID(format!(
                "unknown zone {}-{}",
                region, number
            )));
        }
        Ok(Self { region, number })
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.region, self.number)
    }
}

impl FromStr for Zone {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdError::InvalidID(format!("unknown zone {:?}", s));
        let (region, number) = s.rsplit_once('-').ok_or_else(invalid)?;
        let region: Region = region.parse().map_err(|_| invalid())?;
        let number: u8 = number.parse().map_err(|_| invalid())?;
        Zone::new(region, number)
    }
}

/// Either a region or a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locality {
    Region(Region),
    Zone(Zone),
}

impl Locality {
    pub fn region(&self) -> Region {
        match self {
            Locality::Region(region) => *region,
            Locality::Zone(zone) => zone.region,
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locality::Region(region) => region.fmt(f),
            Locality::Zone(zone) => zone.fmt(f),
        }
    }
}

impl FromStr for Locality {
    type Err = IdError;

    /// Regions are a closed set; anything else must be a zone of one
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(region) = s.parse::<Region>() {
            return Ok(Locality::Region(region));
        }
        s.parse::<Zone>()
            .map(Locality::Zone)
            .map_err(|_| IdError::InvalidID(format!("unknown locality {:?}", s)))
    }
}
