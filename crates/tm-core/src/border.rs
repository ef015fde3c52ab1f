use serde::{Deserialize, Serialize};

/// How out-of-range samples are produced when a kernel overhangs a signal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderMode {
    /// Repeat the nearest edge sample.
    #[default]
    Clamp,
    /// Use a fixed value outside the signal.
    Constant(f32),
    /// Mirror around the edge sample without repeating it (`dcb|abcd|cba`).
    Reflect101,
}

impl BorderMode {
    /// Reads `signal[i]`, resolving out-of-range `i` per the mode.
    /// Empty signals read as `0.0` unless the mode is `Constant`.
    #[inline]
    pub fn fetch(&self, signal: &[f32], i: isize) -> f32 {
        if i >= 0 && (i as usize) < signal.len() {
            return signal[i as usize];
        }
        match self {
            Self::Constant(c) => *c,
            mode => map_index(i, signal.len(), mode).map_or(0.0, |idx| signal[idx]),
        }
    }
}

/// Maps a possibly out-of-range index into `[0, len)`. Returns `None` for
/// `Constant` (caller substitutes the fill value) and for empty signals.
pub fn map_index(i: isize, len: usize, mode: &BorderMode) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match mode {
        BorderMode::Constant(_) => None,
        BorderMode::Clamp => Some(i.clamp(0, len as isize - 1) as usize),
        BorderMode::Reflect101 => {
            if len == 1 {
                return Some(0);
            }
            let period = (2 * len - 2) as isize;
            let r = i.rem_euclid(period) as usize;
            Some(if r < len { r } else { 2 * len - 2 - r })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BorderMode, map_index};

    #[test]
    fn clamp_mapping_handles_negative_and_overflow() {
        let mode = BorderMode::Clamp;

        assert_eq!(map_index(-3, 5, &mode), Some(0));
        assert_eq!(map_index(4, 5, &mode), Some(4));
        assert_eq!(map_index(99, 5, &mode), Some(4));
        assert_eq!(map_index(0, 0, &mode), None);
    }

    #[test]
    fn reflect101_small_lengths() {
        let mode = BorderMode::Reflect101;

        for i in -4..=4 {
            assert_eq!(map_index(i, 1, &mode), Some(0));
        }
        let cases_len5 = [(-5, 3), (-1, 1), (0, 0), (4, 4), (5, 3), (7, 1)];
        for (i, expected) in cases_len5 {
            assert_eq!(map_index(i, 5, &mode), Some(expected));
        }
    }

    #[test]
    fn fetch_uses_fill_value_for_constant() {
        let s = [1.0f32, 2.0, 3.0];
        assert_eq!(BorderMode::Constant(9.0).fetch(&s, -1), 9.0);
        assert_eq!(BorderMode::Clamp.fetch(&s, 7), 3.0);
        assert_eq!(BorderMode::Reflect101.fetch(&s, -1), 2.0);
        assert_eq!(BorderMode::Clamp.fetch(&s, 1), 2.0);
    }
}
