//! # Adaptive Bitrate Policy
//!
//! The on-screen slot gets automatic quality selection; preloading slots are
//! pinned to the cheapest rendition so they buffer without stealing
//! bandwidth from the active stream.

use bridge_traits::{QualityTier, VideoDecoder};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Quality mode a slot should be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbrDirective {
    /// Let the decoder pick (slot is on screen).
    Auto,
    /// Pin the lowest tier (slot is preloading).
    PinLowest,
}

/// What the controller actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbrOutcome {
    AutoEnabled,
    AlreadyAuto,
    Pinned(QualityTier),
    AlreadyPinned(QualityTier),
    /// No tiers known yet: automatic mode was switched off and the pin must
    /// be re-applied once the decoder reports its renditions.
    Deferred,
}

impl AbrOutcome {
    pub fn is_deferred(&self) -> bool {
        matches!(self, AbrOutcome::Deferred)
    }
}

/// Stateless role → quality policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveBitrateController;

impl AdaptiveBitrateController {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, directive: AbrDirective, decoder: &dyn VideoDecoder) -> AbrOutcome {
        match directive {
            AbrDirective::Auto => self.on_promote(decoder),
            AbrDirective::PinLowest => self.on_demote(decoder),
        }
    }

    pub fn on_promote(&self, decoder: &dyn VideoDecoder) -> AbrOutcome {
        if decoder.is_auto_quality_mode() {
            return AbrOutcome::AlreadyAuto;
        }

        decoder.set_auto_quality_mode(true);
        debug!("ABR enabled");
        AbrOutcome::AutoEnabled
    }

    pub fn on_demote(&self, decoder: &dyn VideoDecoder) -> AbrOutcome {
        let Some(lowest) = Self::lowest_tier(&decoder.qualities()) else {
            if decoder.is_auto_quality_mode() {
                decoder.set_auto_quality_mode(false);
            }
            debug!("ABR disabled, pin deferred until qualities are known");
            return AbrOutcome::Deferred;
        };

        let auto = decoder.is_auto_quality_mode();
        let current = decoder.quality();
        if !auto && current.as_ref() == Some(&lowest) {
            return AbrOutcome::AlreadyPinned(lowest);
        }

        if auto {
            decoder.set_auto_quality_mode(false);
        }
        decoder.set_quality(&lowest);
        debug!(quality = %lowest.name, "ABR disabled with lowest quality");
        AbrOutcome::Pinned(lowest)
    }

    /// Cheapest rendition by bitrate, ties broken by pixel count.
    pub fn lowest_tier(tiers: &[QualityTier]) -> Option<QualityTier> {
        tiers
            .iter()
            .min_by_key(|tier| (tier.bitrate, u64::from(tier.width) * u64::from(tier.height)))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{
        BridgeError, DecoderListener, DecoderState, SubscriptionId, SurfaceId,
    };
    use mockall::{mock, predicate::*};

    mock! {
        pub Decoder {}

        #[async_trait::async_trait]
        impl VideoDecoder for Decoder {
            async fn attach(&self, surface: SurfaceId) -> Result<(), BridgeError>;
            async fn load(&self, url: &str) -> Result<(), BridgeError>;
            fn play(&self) -> Result<(), BridgeError>;
            fn pause(&self) -> Result<(), BridgeError>;
            fn is_paused(&self) -> bool;
            fn set_muted(&self, muted: bool);
            fn is_muted(&self) -> bool;
            fn set_auto_quality_mode(&self, enabled: bool);
            fn is_auto_quality_mode(&self) -> bool;
            fn set_quality(&self, tier: &QualityTier);
            fn quality(&self) -> Option<QualityTier>;
            fn qualities(&self) -> Vec<QualityTier>;
            fn state(&self) -> DecoderState;
            fn subscribe(&self, listener: DecoderListener) -> SubscriptionId;
            fn unsubscribe(&self, id: SubscriptionId);
            fn release(&self);
        }
    }

    fn tiers() -> Vec<QualityTier> {
        vec![
            QualityTier::new("1080p", 6_000_000, 1920, 1080),
            QualityTier::new("720p", 3_000_000, 1280, 720),
            QualityTier::new("160p", 230_000, 284, 160),
        ]
    }

    #[test]
    fn test_promote_enables_auto() {
        let mut decoder = MockDecoder::new();
        decoder.expect_is_auto_quality_mode().return_const(false);
        decoder
            .expect_set_auto_quality_mode()
            .with(eq(true))
            .times(1)
            .return_const(());

        let outcome = AdaptiveBitrateController::new().on_promote(&decoder);
        assert_eq!(outcome, AbrOutcome::AutoEnabled);
    }

    #[test]
    fn test_promote_skips_when_already_auto() {
        let mut decoder = MockDecoder::new();
        decoder.expect_is_auto_quality_mode().return_const(true);
        decoder.expect_set_auto_quality_mode().never();

        let outcome = AdaptiveBitrateController::new().on_promote(&decoder);
        assert_eq!(outcome, AbrOutcome::AlreadyAuto);
    }

    #[test]
    fn test_demote_pins_lowest() {
        let mut decoder = MockDecoder::new();
        decoder.expect_qualities().returning(tiers);
        decoder.expect_is_auto_quality_mode().return_const(true);
        decoder.expect_quality().returning(|| None);
        decoder
            .expect_set_auto_quality_mode()
            .with(eq(false))
            .times(1)
            .return_const(());
        decoder
            .expect_set_quality()
            .withf(|tier| tier.name == "160p")
            .times(1)
            .return_const(());

        let outcome = AdaptiveBitrateController::new().on_demote(&decoder);
        assert!(matches!(outcome, AbrOutcome::Pinned(ref tier) if tier.name == "160p"));
    }

    #[test]
    fn test_demote_skips_when_already_pinned() {
        let lowest = QualityTier::new("160p", 230_000, 284, 160);
        let mut decoder = MockDecoder::new();
        decoder.expect_qualities().returning(tiers);
        decoder.expect_is_auto_quality_mode().return_const(false);
        decoder.expect_quality().returning(move || Some(lowest.clone()));
        decoder.expect_set_quality().never();
        decoder.expect_set_auto_quality_mode().never();

        let outcome = AdaptiveBitrateController::new().on_demote(&decoder);
        assert!(matches!(outcome, AbrOutcome::AlreadyPinned(_)));
    }

    #[test]
    fn test_demote_without_tiers_defers() {
        let mut decoder = MockDecoder::new();
        decoder.expect_qualities().returning(Vec::new);
        decoder.expect_is_auto_quality_mode().return_const(true);
        decoder
            .expect_set_auto_quality_mode()
            .with(eq(false))
            .times(1)
            .return_const(());
        decoder.expect_set_quality().never();

        let outcome = AdaptiveBitrateController::new().on_demote(&decoder);
        assert!(outcome.is_deferred());
    }

    #[test]
    fn test_apply_dispatches_on_directive() {
        let mut decoder = MockDecoder::new();
        decoder.expect_is_auto_quality_mode().return_const(false);
        decoder.expect_set_auto_quality_mode().return_const(());

        let controller = AdaptiveBitrateController::new();
        assert_eq!(
            controller.apply(AbrDirective::Auto, &decoder),
            AbrOutcome::AutoEnabled
        );
    }

    #[test]
    fn test_lowest_tier_by_bitrate() {
        assert_eq!(
            AdaptiveBitrateController::lowest_tier(&tiers()).map(|t| t.name),
            Some("160p".to_string())
        );
        assert_eq!(AdaptiveBitrateController::lowest_tier(&[]), None);
    }
}
