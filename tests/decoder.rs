mod tests {
    use modled::config::ControlWord;
    use modled::{
        ColorSpec, Configuration, DecodeError, HardwareSpec, Program, RegisterSnapshot, decode,
    };

    fn snapshot(control: u16) -> RegisterSnapshot {
        RegisterSnapshot::from([control, 10, 20, 30, 60, 128, 21, 0])
    }

    #[test]
    fn test_decode_fields() {
        let configuration = decode(&snapshot(0b0011)).unwrap();
        assert_eq!(
            configuration,
            Configuration {
                power: true,
                program: Program::Fixed,
                color: ColorSpec::new(10, 20, 30),
                hardware: HardwareSpec {
                    led_count: 60,
                    pin: 21,
                    brightness: 128,
                },
            }
        );
    }

    #[test]
    fn test_decode_is_pure() {
        for control in 0..16 {
            let snapshot = snapshot(control);
            assert_eq!(decode(&snapshot), decode(&snapshot));
        }
    }

    #[test]
    fn test_power_bit() {
        assert!(!decode(&snapshot(0b0000)).unwrap().power);
        assert!(!decode(&snapshot(0b1110)).unwrap().power);
        assert!(decode(&snapshot(0b0001)).unwrap().power);
    }

    #[test]
    fn test_program_priority() {
        // strand test > rainbow > fixed, whatever the fixed bit says
        assert_eq!(decode(&snapshot(0b0001)).unwrap().program, Program::Fixed);
        assert_eq!(decode(&snapshot(0b0011)).unwrap().program, Program::Fixed);
        assert_eq!(decode(&snapshot(0b0101)).unwrap().program, Program::Rainbow);
        assert_eq!(decode(&snapshot(0b0111)).unwrap().program, Program::Rainbow);
        assert_eq!(decode(&snapshot(0b1001)).unwrap().program, Program::StrandTest);
        assert_eq!(decode(&snapshot(0b1101)).unwrap().program, Program::StrandTest);
        assert_eq!(decode(&snapshot(0b1111)).unwrap().program, Program::StrandTest);
        assert_eq!(decode(&snapshot(0b1100)).unwrap().program, Program::StrandTest);
    }

    #[test]
    fn test_control_word_flags() {
        let control = ControlWord(0b1110);
        assert!(!control.power());
        assert!(control.fixed_requested());
        assert!(control.rainbow_requested());
        assert!(control.strand_test_requested());
        assert_eq!(control.program(), Program::StrandTest);
    }

    #[test]
    fn test_short_snapshot() {
        let short = RegisterSnapshot::from_slice(&[0b0011, 255, 0, 0, 8, 255, 18]);
        assert_eq!(
            decode(&short),
            Err(DecodeError::Short {
                expected: 8,
                actual: 7
            })
        );
        assert!(decode(&RegisterSnapshot::default()).is_err());
    }

    #[test]
    fn test_extra_words_are_ignored() {
        let long = RegisterSnapshot::from_slice(&[0b0101, 1, 2, 3, 4, 5, 6, 7, 99, 99]);
        let configuration = decode(&long).unwrap();
        assert_eq!(configuration.program, Program::Rainbow);
        assert_eq!(configuration.hardware.pin, 6);
    }

    #[test]
    fn test_program_names() {
        for program in [Program::Fixed, Program::Rainbow, Program::StrandTest] {
            assert_eq!(Program::parse_from_str(program.as_str()), Some(program));
        }
        assert_eq!(Program::parse_from_str("aurora"), None);
    }
}
