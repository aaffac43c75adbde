///! Development tools: dumps of the stack and the dictionary.
use std::io::Write;

use byteorder::ByteOrder;

use crate::forth::vm::vocables::Vocabulary;
use crate::forth::vm::{dict, Cell};

pub fn load<C: Cell, B: ByteOrder>() -> Vocabulary<C, B> {
    let mut v = Vocabulary::new();
    primitives! {
        v,
        fn run_print_stack(vm, ".s") {
            let items: Vec<String> = vm
                .stack
                .contents()
                .iter()
                .map(|c| c.to_int().to_string())
                .collect();
            writeln!(vm.stdout, "stack: {}", items.join(" "))?;
            vm.stdout.flush()?;
        }
        fn run_print_words(vm, ".w") {
            let mut names = Vec::new();
            let mut entry = dict::latest(&vm.arena)?;
            while !entry.is_zero() {
                let name = dict::entry_name(&vm.arena, entry)?;
                names.push(String::from_utf8_lossy(name).into_owned());
                entry = vm.arena.cell_get(entry)?;
            }
            names.reverse();
            writeln!(vm.stdout, "words: {}", names.join(" "))?;
            vm.stdout.flush()?;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use crate::forth::vm::test_util::run_io_test;

    #[test]
    fn print_stack_bottom_to_top() {
        let (_, output) = run_io_test("1 2 3 .s").unwrap();
        assert_eq!(output, "stack: 1 2 3\n");
        let (_, output) = run_io_test("-1 .s").unwrap();
        assert_eq!(output, "stack: -1\n");
    }

    #[test]
    fn print_words_oldest_first() {
        let (_, output) = run_io_test(".w").unwrap();
        assert!(output.starts_with("words: + - * divmod"));
        assert!(output.trim_end().ends_with("boot-done"));
        let (_, output) = run_io_test(": brand-new ; .w").unwrap();
        assert!(output.trim_end().ends_with("brand-new"));
    }
}
