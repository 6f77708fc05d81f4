use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::Error;

/// Short form: `PT#1`, `PT-01`, `PT1-TOR`.
static SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]{2})[-#]?([0-9]{1,3})(-TOR)?$").expect("short pattern"));

/// Long form (secure-core and free-tier naming): `IS-DE-01`, `SE-FREE#3`.
static LONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{2})[-#]?([A-Z]{2}|FREE)[-#]?([0-9]{1,3})(-TOR)?$").expect("long pattern")
});

/// A parsed, canonical servername.
///
/// Canonical renderings are `CC#N` and `CC1-CC2#N`, with an optional `-TOR`
/// suffix and leading zeros stripped from the number. Parsing accepts both
/// grammars case-insensitively, with `-` or `#` separators in any accepted
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Servername {
    country: String,
    via: Option<String>,
    number: u16,
    tor: bool,
}

impl Servername {
    /// Entry country code (`IS` in `IS-DE#1`).
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Second leg of a long-form name (`DE` in `IS-DE#1`, or `FREE`).
    pub fn via(&self) -> Option<&str> {
        self.via.as_deref()
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn is_tor(&self) -> bool {
        self.tor
    }

    /// Whether `raw` matches either accepted grammar.
    pub fn is_valid(raw: &str) -> bool {
        raw.parse::<Servername>().is_ok()
    }
}

impl FromStr for Servername {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Error> {
        let norm = raw.trim().to_ascii_uppercase();

        if let Some(caps) = SHORT.captures(&norm) {
            return Ok(Self {
                country: caps[1].to_string(),
                via: None,
                number: caps[2].parse().map_err(|_| illegal(raw))?,
                tor: caps.get(3).is_some(),
            });
        }

        if let Some(caps) = LONG.captures(&norm) {
            return Ok(Self {
                country: caps[1].to_string(),
                via: Some(caps[2].to_string()),
                number: caps[3].parse().map_err(|_| illegal(raw))?,
                tor: caps.get(4).is_some(),
            });
        }

        Err(illegal(raw))
    }
}

fn illegal(raw: &str) -> Error {
    Error::InvalidArgument(format!("unexpected servername \"{raw}\""))
}

impl fmt::Display for Servername {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.via {
            Some(via) => write!(f, "{}-{via}#{}", self.country, self.number)?,
            None => write!(f, "{}#{}", self.country, self.number)?,
        }
        if self.tor {
            write!(f, "-TOR")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        raw.parse::<Servername>().unwrap().to_string()
    }

    #[test]
    fn short_forms_canonicalize() {
        assert_eq!(canon("PT#1"), "PT#1");
        assert_eq!(canon("pt-01"), "PT#1");
        assert_eq!(canon("PT1"), "PT#1");
        assert_eq!(canon("se#003"), "SE#3");
        assert_eq!(canon(" ch-12 "), "CH#12");
    }

    #[test]
    fn short_form_tor_suffix_is_kept() {
        assert_eq!(canon("PT1-TOR"), "PT#1-TOR");
        assert_eq!(canon("pt#01-tor"), "PT#1-TOR");
    }

    #[test]
    fn long_forms_canonicalize() {
        assert_eq!(canon("IS-DE-01"), "IS-DE#1");
        assert_eq!(canon("is-de#1"), "IS-DE#1");
        assert_eq!(canon("SE-FREE#3"), "SE-FREE#3");
        assert_eq!(canon("se-free-003"), "SE-FREE#3");
        assert_eq!(canon("CH-US-25-TOR"), "CH-US#25-TOR");
    }

    #[test]
    fn parsed_parts_are_exposed() {
        let name: Servername = "is-de-04".parse().unwrap();
        assert_eq!(name.country(), "IS");
        assert_eq!(name.via(), Some("DE"));
        assert_eq!(name.number(), 4);
        assert!(!name.is_tor());
    }

    #[test]
    fn canonical_form_reparses_to_itself() {
        for raw in ["PT#1", "pt-001", "IS-DE-01", "SE-FREE#3", "PT1-TOR"] {
            let once = canon(raw);
            assert_eq!(canon(&once), once);
            assert!(Servername::is_valid(&once));
        }
    }

    #[test]
    fn malformed_names_are_rejected() {
        for raw in [
            "",
            "P",
            "PTX#1",
            "PT#1234",
            "PT",
            "1PT",
            "PT#1-TORX",
            "IS-DEF-01",
            "IS_DE-01",
            "PT##1",
        ] {
            assert!(!Servername::is_valid(raw), "{raw:?} should be invalid");
        }
    }

    #[test]
    fn parse_error_is_invalid_argument() {
        let err = "not-a-server".parse::<Servername>().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
