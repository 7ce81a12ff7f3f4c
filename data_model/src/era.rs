//! Mortality window of an extrinsic.
//!
//! The two-byte mortal encoding packs `log2(period) - 1` into the low
//! nibble and the quantized phase into the remaining twelve bits, so a
//! round trip only preserves eras built through [`Era::mortal`].

use core::str::FromStr;

use parity_scale_codec::{Decode, DecodeAll, Encode, Input, Output};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::Error;

/// Period applied when the caller does not ask for a specific one.
pub const DEFAULT_ERA_PERIOD: u64 = 64;
/// Shortest representable mortality period, in blocks.
pub const MIN_ERA_PERIOD: u64 = 4;
/// Longest representable mortality period, in blocks.
pub const MAX_ERA_PERIOD: u64 = 65_536;

/// Window of blocks during which a transaction may be included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub enum Era {
    /// Valid forever. Only sensible on chains whose genesis never changes.
    Immortal,
    /// Valid for `period` blocks starting at the era birth block.
    Mortal {
        /// Window length, a power of two between 4 and 65536.
        period: u64,
        /// Offset of the birth block within the window, quantized.
        phase: u64,
    },
}

impl Era {
    /// Mortal era covering `current`, with `period` rounded to the nearest
    /// representable value and the phase quantized accordingly.
    pub fn mortal(period: u64, current: u64) -> Self {
        let period = period
            .checked_next_power_of_two()
            .unwrap_or(MAX_ERA_PERIOD)
            .clamp(MIN_ERA_PERIOD, MAX_ERA_PERIOD);
        let phase = current % period;
        let quantize_factor = (period >> 12).max(1);
        let quantized_phase = phase / quantize_factor * quantize_factor;
        Self::Mortal {
            period,
            phase: quantized_phase,
        }
    }

    /// First block at which a transaction with this era is valid.
    pub fn birth(self, current: u64) -> u64 {
        match self {
            Self::Immortal => 0,
            Self::Mortal { period, phase } => {
                (current.max(phase) - phase) / period * period + phase
            }
        }
    }

    /// First block at which a transaction with this era is no longer valid.
    pub fn death(self, current: u64) -> u64 {
        match self {
            Self::Immortal => u64::MAX,
            Self::Mortal { period, .. } => self.birth(current) + period,
        }
    }

    /// Checks that a user-supplied period is representable as given.
    ///
    /// Unlike [`Era::mortal`], which silently rounds, this rejects anything
    /// that is not a power of two inside the supported range.
    ///
    /// # Errors
    ///
    /// [`Error::EraPeriod`] with the offending value.
    pub fn validate_period(period: u64) -> Result<u64, Error> {
        if period.is_power_of_two() && (MIN_ERA_PERIOD..=MAX_ERA_PERIOD).contains(&period) {
            Ok(period)
        } else {
            Err(Error::EraPeriod(period))
        }
    }
}

impl Encode for Era {
    fn size_hint(&self) -> usize {
        match self {
            Self::Immortal => 1,
            Self::Mortal { .. } => 2,
        }
    }

    fn encode_to<T: Output + ?Sized>(&self, dest: &mut T) {
        match self {
            Self::Immortal => dest.push_byte(0),
            Self::Mortal { period, phase } => {
                let quantize_factor = (*period >> 12).max(1);
                // The low nibble is clamped to 15 and the quantized phase
                // occupies at most twelve bits.
                #[allow(clippy::cast_possible_truncation)]
                let encoded = (period.trailing_zeros() - 1).clamp(1, 15) as u16
                    | ((phase / quantize_factor) << 4) as u16;
                encoded.encode_to(dest);
            }
        }
    }
}

impl Decode for Era {
    fn decode<I: Input>(input: &mut I) -> Result<Self, parity_scale_codec::Error> {
        let first = input.read_byte()?;
        if first == 0 {
            return Ok(Self::Immortal);
        }
        let encoded = u64::from(first) + (u64::from(input.read_byte()?) << 8);
        let period = 2 << (encoded % (1 << 4));
        let quantize_factor = (period >> 12).max(1);
        let phase = (encoded >> 4) * quantize_factor;
        if period >= MIN_ERA_PERIOD && phase < period {
            Ok(Self::Mortal { period, phase })
        } else {
            Err("Invalid period and phase".into())
        }
    }
}

impl core::fmt::Display for Era {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", kestrel_crypto::hex_encode(self.encode()))
    }
}

impl FromStr for Era {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let bytes = kestrel_crypto::hex_decode(text)?;
        Ok(Self::decode_all(&mut bytes.as_slice())?)
    }
}
