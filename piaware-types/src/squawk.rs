//! Transponder emergency codes.

use std::fmt;

/// A squawk code reserved for emergencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmergencySquawk {
    /// 7500
    UnlawfulInterference,
    /// 7600
    RadioFailure,
    /// 7700
    GeneralEmergency,
}

impl EmergencySquawk {
    pub const ALL: [EmergencySquawk; 3] = [
        EmergencySquawk::UnlawfulInterference,
        EmergencySquawk::RadioFailure,
        EmergencySquawk::GeneralEmergency,
    ];

    /// Match a transponder code as reported by the receiver.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "7500" => Some(EmergencySquawk::UnlawfulInterference),
            "7600" => Some(EmergencySquawk::RadioFailure),
            "7700" => Some(EmergencySquawk::GeneralEmergency),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EmergencySquawk::UnlawfulInterference => "7500",
            EmergencySquawk::RadioFailure => "7600",
            EmergencySquawk::GeneralEmergency => "7700",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EmergencySquawk::UnlawfulInterference => "Unlawful interference (hijacking)",
            EmergencySquawk::RadioFailure => "Aircraft has lost verbal communication",
            EmergencySquawk::GeneralEmergency => "General emergency",
        }
    }
}

impl fmt::Display for EmergencySquawk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(
            EmergencySquawk::from_code("7500"),
            Some(EmergencySquawk::UnlawfulInterference)
        );
        assert_eq!(
            EmergencySquawk::from_code(" 7700"),
            Some(EmergencySquawk::GeneralEmergency)
        );
        assert_eq!(EmergencySquawk::from_code("7000"), None);
        assert_eq!(EmergencySquawk::from_code(""), None);
    }

    #[test]
    fn test_code_matches_from_code() {
        for squawk in EmergencySquawk::ALL {
            assert_eq!(EmergencySquawk::from_code(squawk.code()), Some(squawk));
        }
    }
}
