///! Character and stream I/O words.
use std::fs;
use std::io::{BufReader, Write};

use byteorder::ByteOrder;
use log::warn;

use crate::forth::vm::vocables::Vocabulary;
use crate::forth::vm::{Cell, VmError};

pub fn load<C: Cell, B: ByteOrder>() -> Vocabulary<C, B> {
    let mut v = Vocabulary::new();
    primitives! {
        v,
        fn run_key(vm, "key") {
            match vm.getc()? {
                Some(byte) => vm.stack_push(<C as From<u8>>::from(byte))?,
                // No value is pushed at end of input; a caller that
                // keeps popping will see the underflow.
                None => warn!("key: end of input"),
            }
        }
        fn run_emit(vm, "emit") {
            let value = vm.stack_pop()?;
            if value.to_uint() >= 256 {
                return Err(VmError::NotAChar(value.to_int()));
            }
            let byte = [value.to_uint() as u8];
            vm.stdout.write_all(&byte)?;
            vm.stdout.flush()?;
        }
        fn run_tell(vm, "tell") {
            let address = vm.stack_pop()?;
            let bytes = vm.arena.cstr(address)?.to_vec();
            vm.stdout.write_all(&bytes)?;
            vm.stdout.flush()?;
        }
        // Read the next token and push the address of the shared token
        // buffer. The buffer is overwritten by the next token read, so
        // consumers compiled after `word` must use the address before
        // control returns to the outer interpreter.
        fn run_word(vm, "word") {
            let address = vm.read_word()?.ok_or(VmError::UnexpectedEof)?;
            vm.stack_push(address)?;
        }

        // Stream handles
        fn run_stdin(vm, "stdin") {
            vm.stack_push(C::zero())?;
        }
        fn run_get_input_stream(vm, "get-input-stream") {
            let handle = vm.input;
            vm.stack_push(handle)?;
        }
        fn run_set_input_stream(vm, "set-input-stream") {
            let handle = vm.stack_pop()?;
            vm.set_input(handle)?;
        }
        // ( path-addr -- handle ), read-only
        fn run_open_read_file(vm, "open-read-file") {
            let address = vm.stack_pop()?;
            let path = String::from_utf8_lossy(vm.arena.cstr(address)?).into_owned();
            let file = fs::File::open(&path)?;
            let handle = vm.intern_stream(Box::new(BufReader::new(file)));
            vm.stack_push(handle)?;
        }
        fn run_close_file(vm, "close-file") {
            let handle = vm.stack_pop()?;
            vm.streams
                .remove(handle)
                .ok_or_else(|| VmError::UnknownStream(handle.to_uint()))?;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use crate::forth::vm::test_util::{bootstrapped_vm, feed, run_io_test, run_test};
    use crate::forth::vm::VmError;

    #[test]
    fn emit_writes_bytes() {
        let (stack, output) = run_io_test("72 emit 105 emit").unwrap();
        assert_eq!(stack, vec![]);
        assert_eq!(output, "Hi");
    }

    #[test]
    fn emit_rejects_non_characters() {
        assert!(matches!(run_test("300 emit"), Err(VmError::NotAChar(300))));
    }

    #[test]
    fn key_reads_one_byte() {
        // After the `key` token its trailing space is already consumed,
        // so the byte read is the A.
        assert_eq!(run_test("key A").unwrap(), vec![65]);
    }

    #[test]
    fn tell_prints_a_token() {
        let (stack, output) = run_io_test(": greet word tell ; greet hello").unwrap();
        assert_eq!(stack, vec![]);
        assert_eq!(output, "hello");
    }

    #[test]
    fn long_tokens_are_truncated_to_63_bytes() {
        let long = "a".repeat(70);
        let (_, output) = run_io_test(&format!(": echo word tell ; echo {}", long)).unwrap();
        assert_eq!(output, "a".repeat(63));
    }

    #[test]
    fn open_and_close_a_file() {
        // cargo runs tests from the crate root, where startup.f lives
        let mut vm = bootstrapped_vm();
        feed(&mut vm, ": open word open-read-file ; open startup.f").unwrap();
        assert_eq!(vm.stack_contents().len(), 1);
        feed(&mut vm, "close-file").unwrap();
        assert_eq!(vm.stack_contents(), vec![]);
    }

    #[test]
    fn open_missing_file_errors() {
        let mut vm = bootstrapped_vm();
        let result = feed(&mut vm, ": open word open-read-file ; open no-such-file.f");
        assert!(matches!(result, Err(VmError::Io(_))));
    }

    #[test]
    fn close_file_rejects_unknown_handles() {
        assert!(matches!(
            run_test("99 close-file"),
            Err(VmError::UnknownStream(99))
        ));
    }

    #[test]
    fn stdin_pushes_handle_zero() {
        assert_eq!(run_test("stdin").unwrap(), vec![0]);
    }
}
