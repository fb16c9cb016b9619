use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::{
    error::WriteError,
    nuc::{self, PackedProbe, MAX_PROBE_LENGTH},
    Result, RNG_SEED,
};

/// Policy for handling probes with bases outside `ACGT`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Policy {
    /// Skip the hit carrying the probe
    IgnoreSequence,
    #[default]
    BreakOnInvalid,
    RandomDraw,
    SetToA,
    SetToC,
    SetToG,
    SetToT,
}
impl Policy {
    fn fill_with_known(sequence: &[u8], val: u8, ibuf: &mut Vec<u8>) {
        for &n in sequence {
            ibuf.push(match n {
                b'A' | b'C' | b'G' | b'T' => n,
                _ => val,
            });
        }
    }

    fn fill_with_random<R: Rng>(sequence: &[u8], rng: &mut R, ibuf: &mut Vec<u8>) {
        for &n in sequence {
            ibuf.push(match n {
                b'A' | b'C' | b'G' | b'T' => n,
                _ => b"ACGT"[rng.random_range(0..4)],
            });
        }
    }

    /// Convert the probe according to the N-policy
    ///
    /// First clears the input buffer to ensure that it is empty.
    ///
    /// Returns a boolean indicating whether the probe should be written.
    /// Returns an error if the policy breaks on invalid nucleotides.
    ///
    /// # Arguments
    /// * `sequence` - The probe to be converted
    /// * `ibuf` - The buffer to store the converted probe
    /// * `rng` - The random number generator
    pub fn handle<R: Rng>(&self, sequence: &[u8], ibuf: &mut Vec<u8>, rng: &mut R) -> Result<bool> {
        ibuf.clear();
        match self {
            Self::IgnoreSequence => Ok(false),
            Self::BreakOnInvalid => {
                let seq_str = std::str::from_utf8(sequence)?.to_string();
                Err(WriteError::InvalidNucleotideSequence(seq_str).into())
            }
            Self::RandomDraw => {
                Self::fill_with_random(sequence, rng, ibuf);
                Ok(true)
            }
            Self::SetToA => {
                Self::fill_with_known(sequence, b'A', ibuf);
                Ok(true)
            }
            Self::SetToC => {
                Self::fill_with_known(sequence, b'C', ibuf);
                Ok(true)
            }
            Self::SetToG => {
                Self::fill_with_known(sequence, b'G', ibuf);
                Ok(true)
            }
            Self::SetToT => {
                Self::fill_with_known(sequence, b'T', ibuf);
                Ok(true)
            }
        }
    }
}

/// Packs probes for a writer, applying a [`Policy`] to invalid bases
#[derive(Debug, Clone)]
pub struct ProbeEncoder {
    policy: Policy,
    rng: SmallRng,
    ubuf: Vec<u8>,
    ibuf: Vec<u8>,
}
impl ProbeEncoder {
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            rng: SmallRng::seed_from_u64(RNG_SEED),
            ubuf: Vec::with_capacity(MAX_PROBE_LENGTH),
            ibuf: Vec::with_capacity(MAX_PROBE_LENGTH),
        }
    }

    #[must_use]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Packs a probe, returning `None` when the policy drops it
    pub fn encode(&mut self, probe: &[u8]) -> Result<Option<PackedProbe>> {
        if probe.len() > MAX_PROBE_LENGTH {
            return Err(WriteError::ProbeTooLong {
                length: probe.len(),
                capacity: MAX_PROBE_LENGTH,
            }
            .into());
        }

        self.ubuf.clear();
        self.ubuf.extend(probe.iter().map(u8::to_ascii_uppercase));
        if self
            .ubuf
            .iter()
            .all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
        {
            return nuc::pack(&self.ubuf).map(Some);
        }

        if self.policy.handle(&self.ubuf, &mut self.ibuf, &mut self.rng)? {
            nuc::pack(&self.ibuf).map(Some)
        } else {
            Ok(None)
        }
    }
}
