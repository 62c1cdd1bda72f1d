//! Entropy source identifiers and their classification.
//!
//! Every harvested sample is tagged with the [`EntropySource`] that produced
//! it. The source determines how the router treats the sample: whether it
//! counts as high-quality input, whether it is test-only noise, and whether
//! the driver pushes samples or has them pulled on demand.

mod seen;

pub use seen::{ReseedSeenCounters, SeenSet, RESEED_WINDOW_BYTES};

/// How samples from a source reach the pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessClass {
    /// The source delivers samples as events happen.
    Push,
    /// Samples are polled from the source by a harvesting loop.
    Pull,
}

/// Trust placed in the bytes a source delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceQuality {
    /// Dedicated hardware RNGs and similar trusted inputs.
    High,
    /// General event timing noise.
    Low,
    /// Known-bad noise used for testing. Never treated as high quality.
    Garbage,
}

/// Classification of a single source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceClass {
    /// Delivery model.
    pub access: AccessClass,
    /// Quality of the delivered bytes.
    pub quality: SourceQuality,
}

impl SourceClass {
    const fn new(access: AccessClass, quality: SourceQuality) -> Self {
        Self { access, quality }
    }
}

/// The closed set of entropy sources known to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntropySource {
    /// Seed material cached from a previous boot.
    Cached,
    /// Device attach timing.
    Attach,
    /// Keyboard event timing.
    Keyboard,
    /// Mouse event timing.
    Mouse,
    /// Tunnel interface packets.
    NetTun,
    /// Packet filter taps.
    NetBpf,
    /// Ethernet receive path.
    NetEther,
    /// Netgraph nodes.
    NetGraph,
    /// Hardware interrupt timing.
    Interrupt,
    /// Software interrupt timing.
    SoftInterrupt,
    /// File access times.
    FsAtime,
    /// Allocator activity.
    Uma,
    /// Callout (timer wheel) execution.
    Callout,
    /// x86 RDRAND.
    Rdrand,
    /// x86 RDSEED.
    Rdseed,
    /// POWER DARN.
    Darn,
    /// virtio-rng device.
    Virtio,
    /// Armv8.5 RNDR.
    Armv8Rndr,
    /// Arm TrustZone TRNG.
    ArmTrng,
    /// Broadcom SoC RNG.
    Broadcom,
    /// AMD crypto co-processor.
    Ccp,
    /// Qualcomm PRNG block.
    Qualcomm,
    /// Trusted Platform Module.
    Tpm,
    /// Hypervisor VM generation ID.
    VmGenId,
    /// Deliberately bad noise for exercising health tests.
    RndTest,
}

impl EntropySource {
    /// Number of distinct sources.
    pub const COUNT: usize = 25;

    /// Every source, in discriminant order.
    pub const ALL: [EntropySource; Self::COUNT] = [
        Self::Cached,
        Self::Attach,
        Self::Keyboard,
        Self::Mouse,
        Self::NetTun,
        Self::NetBpf,
        Self::NetEther,
        Self::NetGraph,
        Self::Interrupt,
        Self::SoftInterrupt,
        Self::FsAtime,
        Self::Uma,
        Self::Callout,
        Self::Rdrand,
        Self::Rdseed,
        Self::Darn,
        Self::Virtio,
        Self::Armv8Rndr,
        Self::ArmTrng,
        Self::Broadcom,
        Self::Ccp,
        Self::Qualcomm,
        Self::Tpm,
        Self::VmGenId,
        Self::RndTest,
    ];

    /// Dense index of this source, `0..COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the static classification of this source.
    pub const fn class(self) -> SourceClass {
        use AccessClass::{Pull, Push};
        use SourceQuality::{Garbage, High, Low};

        match self {
            Self::Cached => SourceClass::new(Push, High),
            Self::Attach
            | Self::Keyboard
            | Self::Mouse
            | Self::NetTun
            | Self::NetBpf
            | Self::NetEther
            | Self::NetGraph
            | Self::Interrupt
            | Self::SoftInterrupt
            | Self::FsAtime
            | Self::Uma
            | Self::Callout => SourceClass::new(Push, Low),
            Self::Rdrand
            | Self::Rdseed
            | Self::Darn
            | Self::Virtio
            | Self::Armv8Rndr
            | Self::ArmTrng
            | Self::Broadcom
            | Self::Ccp
            | Self::Qualcomm => SourceClass::new(Pull, High),
            Self::Tpm | Self::VmGenId => SourceClass::new(Push, High),
            Self::RndTest => SourceClass::new(Pull, Garbage),
        }
    }

    /// Returns true if this source delivers high-quality entropy.
    #[inline]
    pub const fn is_high_quality(self) -> bool {
        matches!(self.class().quality, SourceQuality::High)
    }

    /// Stable lowercase name used in logs and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Attach => "attach",
            Self::Keyboard => "keyboard",
            Self::Mouse => "mouse",
            Self::NetTun => "net_tun",
            Self::NetBpf => "net_bpf",
            Self::NetEther => "net_ether",
            Self::NetGraph => "net_ng",
            Self::Interrupt => "interrupt",
            Self::SoftInterrupt => "swi",
            Self::FsAtime => "fs_atime",
            Self::Uma => "uma",
            Self::Callout => "callout",
            Self::Rdrand => "rdrand",
            Self::Rdseed => "rdseed",
            Self::Darn => "darn",
            Self::Virtio => "virtio",
            Self::Armv8Rndr => "armv8_rndr",
            Self::ArmTrng => "arm_trng",
            Self::Broadcom => "broadcom",
            Self::Ccp => "ccp",
            Self::Qualcomm => "qualcomm",
            Self::Tpm => "tpm",
            Self::VmGenId => "vmgenid",
            Self::RndTest => "rndtest",
        }
    }

    /// Looks a source up by its [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl std::fmt::Display for EntropySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_index_order() {
        for (i, source) in EntropySource::ALL.iter().enumerate() {
            assert_eq!(source.index(), i);
        }
    }

    #[test]
    fn test_garbage_is_never_high() {
        assert_eq!(EntropySource::RndTest.class().quality, SourceQuality::Garbage);
        assert!(!EntropySource::RndTest.is_high_quality());
    }

    #[test]
    fn test_hardware_rngs_are_high_pull() {
        let class = EntropySource::Rdrand.class();
        assert_eq!(class.access, AccessClass::Pull);
        assert_eq!(class.quality, SourceQuality::High);
        assert!(EntropySource::Cached.is_high_quality());
        assert!(!EntropySource::Interrupt.is_high_quality());
    }

    #[test]
    fn test_names_round_trip() {
        for source in EntropySource::ALL {
            assert_eq!(EntropySource::from_name(source.name()), Some(source));
        }
        assert_eq!(EntropySource::from_name("nope"), None);
    }
}
