// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generic types.

/// What a channel measures. Electric channels are dipole voltages, magnetic
/// channels are coil outputs, anything else (battery voltage, temperature,
/// ...) is auxiliary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Electric,
    Magnetic,
    Auxiliary,
}

impl ChannelKind {
    /// The kind implied by a component name: `e*` is electric, `h*`/`b*` is
    /// magnetic, everything else is auxiliary.
    pub fn from_component(component: &str) -> ChannelKind {
        match component.as_bytes().first() {
            Some(b'e') | Some(b'E') => ChannelKind::Electric,
            Some(b'h') | Some(b'H') | Some(b'b') | Some(b'B') => ChannelKind::Magnetic,
            _ => ChannelKind::Auxiliary,
        }
    }

    /// The single-letter tag an MTU-5C writes into its file headers.
    pub(crate) fn tag(self) -> u8 {
        match self {
            ChannelKind::Electric => b'E',
            ChannelKind::Magnetic => b'H',
            ChannelKind::Auxiliary => b'A',
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<ChannelKind> {
        match tag {
            b'E' => Some(ChannelKind::Electric),
            b'H' => Some(ChannelKind::Magnetic),
            b'A' => Some(ChannelKind::Auxiliary),
            _ => None,
        }
    }

    /// The `type` attribute written to archive channels.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Electric => "electric",
            ChannelKind::Magnetic => "magnetic",
            ChannelKind::Auxiliary => "auxiliary",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_component() {
        assert_eq!(ChannelKind::from_component("ex"), ChannelKind::Electric);
        assert_eq!(ChannelKind::from_component("Ey"), ChannelKind::Electric);
        assert_eq!(ChannelKind::from_component("hx"), ChannelKind::Magnetic);
        assert_eq!(ChannelKind::from_component("bz"), ChannelKind::Magnetic);
        assert_eq!(
            ChannelKind::from_component("temperature"),
            ChannelKind::Auxiliary
        );
        assert_eq!(ChannelKind::from_component(""), ChannelKind::Auxiliary);
    }

    #[test]
    fn tag_round_trip() {
        for kind in [
            ChannelKind::Electric,
            ChannelKind::Magnetic,
            ChannelKind::Auxiliary,
        ] {
            assert_eq!(ChannelKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ChannelKind::from_tag(b'Q'), None);
    }
}
