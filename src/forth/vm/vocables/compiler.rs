///! Compilation words and the inline-operand primitives used by
///! compiled code.
use byteorder::ByteOrder;
use log::debug;

use crate::forth::vm::vocables::Vocabulary;
use crate::forth::vm::{arena, dict, Cell, State, VmError};

pub fn load<C: Cell, B: ByteOrder>() -> Vocabulary<C, B> {
    let mut v = Vocabulary::new();
    primitives! {
        v,
        // Inner-interpreter support. All four read their operand from
        // the cell following their own xt in the body being run.
        fn run_lit(vm, "lit") {
            let value = vm.operand()?;
            vm.stack_push(value)?;
        }
        fn run_branch(vm, "branch") {
            let offset = vm.operand()?.to_int();
            vm.branch_by(offset);
        }
        fn run_0branch(vm, "0branch") {
            let flag = vm.stack_pop()?;
            let offset = vm.operand()?.to_int();
            if flag.is_zero() {
                vm.branch_by(offset);
            }
        }
        fn run_exit(vm, "exit") {
            vm.next = vm.rstack_pop()?;
        }
        // The cheat tick: the outer interpreter compiles the xt of the
        // word following ' straight into the body, and at run time we
        // pick that cell up and push it.
        fn run_tick(vm, "'") {
            let xt = vm.operand()?;
            vm.stack_push(xt)?;
        }

        // Defining words
        fn run_colon(vm, ":") {
            if vm.state == State::Compile {
                return Err(VmError::NestedDefinition);
            }
            let address = vm.read_word()?.ok_or(VmError::UnexpectedEof)?;
            let name = vm.arena.cstr(address)?.to_vec();
            debug!("defining {}", String::from_utf8_lossy(&name));
            dict::create(&mut vm.arena, &name, 0, C::zero())?;
            vm.state = State::Compile;
        }
        fn run_semicolon(vm, ";", immediate) {
            if vm.state != State::Compile {
                return Err(VmError::NotCompiling);
            }
            let exit = vm.word_xt("exit")?;
            dict::append_cell(&mut vm.arena, exit)?;
            vm.state = State::Normal;
        }
        fn run_comma(vm, ",") {
            let value = vm.stack_pop()?;
            dict::append_cell(&mut vm.arena, value)?;
        }
        fn run_lbracket(vm, "[", immediate) {
            vm.state = State::Normal;
        }
        fn run_rbracket(vm, "]") {
            vm.state = State::Compile;
        }
        fn run_immediate(vm, "immediate", immediate) {
            let entry = dict::latest(&vm.arena)?;
            if entry.is_zero() {
                return Err(VmError::BadAddress(0));
            }
            let flags = dict::entry_flags(&vm.arena, entry)?;
            dict::set_entry_flags(&mut vm.arena, entry, flags | dict::IMMEDIATE_FLAG)?;
        }

        // Dictionary access. here and latest push the address of the
        // cursor cell, not its value, so @ and ! work on them.
        fn run_here(vm, "here") {
            vm.stack_push(C::from_uint(arena::HERE_ADDR))?;
        }
        fn run_latest(vm, "latest") {
            vm.stack_push(C::from_uint(arena::LATEST_ADDR))?;
        }
        fn run_fetch(vm, "@") {
            let address = vm.stack_pop()?;
            let value = vm.arena.cell_get(address)?;
            vm.stack_push(value)?;
        }
        fn run_store(vm, "!") {
            let address = vm.stack_pop()?;
            let value = vm.stack_pop()?;
            vm.arena.cell_set(address, value)?;
        }
        fn run_find_word(vm, "find-word") {
            let address = vm.stack_pop()?;
            let name = vm.arena.cstr(address)?.to_vec();
            let entry = dict::find(&vm.arena, &name)?.unwrap_or_else(C::zero);
            vm.stack_push(entry)?;
        }
        fn run_code_word(vm, "code-word") {
            let entry = vm.stack_pop()?;
            let xt = dict::code_field_address(&vm.arena, entry)?;
            vm.stack_push(xt)?;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use crate::forth::vm::test_util::{bootstrapped_vm, feed, run_test};
    use crate::forth::vm::VmError;

    #[test]
    fn colon_definitions_run() {
        assert_eq!(run_test(": sq dup * ; 7 sq").unwrap(), vec![49]);
        assert_eq!(run_test(": w ; 1 w").unwrap(), vec![1]);
    }

    #[test]
    fn division_words_from_startup() {
        assert_eq!(run_test("10 3 /").unwrap(), vec![3]);
        assert_eq!(run_test("10 3 %").unwrap(), vec![1]);
    }

    #[test]
    fn conditionals() {
        assert_eq!(
            run_test(": abs dup 0 < if 0 swap - then ; -5 abs 6 abs").unwrap(),
            vec![5, 6]
        );
        assert_eq!(
            run_test(": max over over < if swap then drop ; 3 9 max 10 2 max").unwrap(),
            vec![9, 10]
        );
    }

    #[test]
    fn if_else_nests() {
        let code = ": sign dup 0 < if drop -1 else 0 > if 1 else 0 then then ; \
                    -9 sign 9 sign 0 sign";
        assert_eq!(
            run_test(code).unwrap(),
            vec![(-1i64) as u64, 1, 0]
        );
    }

    #[test]
    fn begin_until_loops() {
        assert_eq!(
            run_test(": cnt 0 begin 1 + dup 3 = until ; cnt").unwrap(),
            vec![3]
        );
    }

    #[test]
    fn while_repeat_loops() {
        assert_eq!(
            run_test(": countdown begin dup 0 > while 1 - repeat ; 5 countdown").unwrap(),
            vec![0]
        );
    }

    #[test]
    fn paren_comments_nest() {
        assert_eq!(
            run_test(": t ( a comment ( nested too ) still one ) 5 ; t").unwrap(),
            vec![5]
        );
    }

    #[test]
    fn hash_comments_reach_end_of_line() {
        assert_eq!(run_test("1 # 2 3\n4").unwrap(), vec![1, 4]);
        assert_eq!(run_test("1# trailing comment\n2").unwrap(), vec![1, 2]);
    }

    #[test]
    fn brackets_switch_state() {
        // [ 1 2 + ] runs at compile time and leaves 3 on the stack; the
        // compiled word itself has an empty body.
        assert_eq!(run_test(": t [ 1 2 + ] ; t").unwrap(), vec![3]);
    }

    #[test]
    fn immediate_words_run_during_compilation() {
        assert_eq!(run_test(": five 5 ; immediate : t five ; t").unwrap(), vec![5]);
    }

    #[test]
    fn bracket_tick_compiles_an_xt_literal() {
        let mut vm = bootstrapped_vm();
        feed(&mut vm, ": t ['] dup ; t").unwrap();
        assert_eq!(vm.stack_contents(), vec![vm.word_xt("dup").unwrap()]);
    }

    #[test]
    fn find_word_and_code_word() {
        let mut vm = bootstrapped_vm();
        feed(&mut vm, ": probe word find-word code-word ; probe dup").unwrap();
        assert_eq!(vm.stack_contents(), vec![vm.word_xt("dup").unwrap()]);
    }

    #[test]
    fn find_word_pushes_null_when_missing() {
        let mut vm = bootstrapped_vm();
        feed(&mut vm, ": probe word find-word ; probe nosuchword").unwrap();
        assert_eq!(vm.stack_contents(), vec![0]);
    }

    #[test]
    fn latest_tracks_definitions() {
        let mut vm = bootstrapped_vm();
        feed(&mut vm, ": t ; latest @").unwrap();
        let entry = vm.stack_pop().unwrap();
        assert_eq!(
            vm.word_xt("t").unwrap(),
            crate::forth::vm::dict::code_field_address(&vm.arena, entry).unwrap()
        );
    }

    #[test]
    fn semicolon_outside_definition_errors() {
        assert!(matches!(run_test(";"), Err(VmError::NotCompiling)));
    }

    #[test]
    fn tick_at_top_level_errors() {
        assert!(matches!(
            run_test("' dup"),
            Err(VmError::OperandOutsideBody)
        ));
    }

    #[test]
    fn number_compiled_as_literal_round_trips() {
        assert_eq!(run_test(": n -12345 ; n").unwrap(), vec![(-12345i64) as u64]);
    }
}
