mod common;

mod tests {
    use std::sync::Arc;

    use modled::{
        ChangeOutcome, Controller, ControllerConfig, InterruptChannel, InterruptToken,
        RegisterBank, RegisterError, RegisterLayout, RegisterSnapshot, VirtualStrip,
    };

    use super::common::{FIXED, POWER, RAINBOW, STRAND_TEST, init_tracing, words};

    /// Handler diffing against a controller that has adopted `adopted`
    fn started(adopted: [u16; 8]) -> (
        Arc<RegisterBank>,
        Controller<VirtualStrip, modled::BankReader>,
    ) {
        init_tracing();
        let layout = RegisterLayout::default();
        let bank = Arc::new(RegisterBank::with_values(0, adopted.to_vec()));
        let controller = Controller::new(
            ControllerConfig::default(),
            VirtualStrip::new(),
            bank.reader(layout),
            Arc::new(InterruptChannel::new()),
        );
        controller.start().unwrap();
        (bank, controller)
    }

    fn write(
        bank: &RegisterBank,
        controller: &Controller<VirtualStrip, modled::BankReader>,
        address: u16,
        value: u16,
    ) -> ChangeOutcome {
        bank.write(address, value).unwrap();
        let snapshot = bank.snapshot(RegisterLayout::default());
        controller
            .change_handler()
            .on_register_written(address, value, || snapshot)
    }

    #[test]
    fn test_brightness_change_is_never_disruptive() {
        let (bank, controller) = started(words(0, 0, 0, 0));
        assert_eq!(write(&bank, &controller, 5, 12), ChangeOutcome::Ignored);
        assert_eq!(write(&bank, &controller, 4, 300), ChangeOutcome::Ignored);
        assert_eq!(write(&bank, &controller, 6, 12), ChangeOutcome::Ignored);
        assert!(controller.interrupts().is_empty());
        controller.stop().unwrap();
    }

    #[test]
    fn test_power_change_posts() {
        let (bank, controller) = started(words(0, 0, 0, 0));
        assert_eq!(
            write(&bank, &controller, 0, POWER),
            ChangeOutcome::Posted(InterruptToken::new(0, POWER))
        );
        controller.stop().unwrap();
    }

    #[test]
    fn test_program_change_posts_even_when_off() {
        let (bank, controller) = started(words(0, 0, 0, 0));
        assert!(matches!(
            write(&bank, &controller, 0, RAINBOW),
            ChangeOutcome::Posted(_)
        ));
        controller.stop().unwrap();
    }

    #[test]
    fn test_color_change_depends_on_program() {
        let (bank, controller) = started(words(POWER | FIXED, 255, 0, 0));
        assert!(matches!(
            write(&bank, &controller, 2, 255),
            ChangeOutcome::Posted(_)
        ));
        controller.stop().unwrap();

        let (bank, controller) = started(words(POWER | RAINBOW, 255, 0, 0));
        assert_eq!(write(&bank, &controller, 2, 255), ChangeOutcome::Ignored);
        controller.stop().unwrap();

        let (bank, controller) = started(words(POWER | STRAND_TEST, 255, 0, 0));
        assert_eq!(write(&bank, &controller, 1, 0), ChangeOutcome::Ignored);
        controller.stop().unwrap();
    }

    #[test]
    fn test_redundant_request_bit_is_ignored() {
        // Fixed bit on top of the rainbow bit does not change the program.
        let (bank, controller) = started(words(POWER | RAINBOW, 0, 0, 0));
        assert_eq!(
            write(&bank, &controller, 0, POWER | RAINBOW | FIXED),
            ChangeOutcome::Ignored
        );
        controller.stop().unwrap();
    }

    #[test]
    fn test_unreadable_snapshot_posts_nothing() {
        let (_bank, controller) = started(words(0, 0, 0, 0));
        let handler = controller.change_handler();

        let outcome = handler.on_register_written(0, POWER, || {
            Err(RegisterError::OutOfBounds {
                address: 0,
                count: 8,
            })
        });
        assert_eq!(outcome, ChangeOutcome::Unreadable);

        let outcome = handler.on_register_written(0, POWER, || {
            Ok(RegisterSnapshot::from_slice(&[POWER, 0, 0]))
        });
        assert_eq!(outcome, ChangeOutcome::Unreadable);
        assert!(controller.interrupts().is_empty());
        controller.stop().unwrap();
    }
}
