///! Primitive words: arithmetic, comparison, logic, and stack shuffles.
use byteorder::ByteOrder;

use crate::forth::vm::vocables::Vocabulary;
use crate::forth::vm::{Cell, VmError};

macro_rules! binop {
    ($vm:ident, $method:ident) => {{
        let n2 = $vm.stack_pop()?;
        let n1 = $vm.stack_pop()?;
        $vm.stack_push(n1.$method(&n2))?;
    }};
}

macro_rules! comparator {
    ($vm:ident, $method:ident) => {{
        let n2 = $vm.stack_pop()?;
        let n1 = $vm.stack_pop()?;
        $vm.stack_push(C::from_bool(n1.to_int().$method(&n2.to_int())))?;
    }};
}

pub fn load<C: Cell, B: ByteOrder>() -> Vocabulary<C, B> {
    let mut v = Vocabulary::new();
    primitives! {
        v,
        // Arithmetic
        fn run_plus(vm, "+") {
            binop!(vm, wrapping_add)
        }
        fn run_minus(vm, "-") {
            binop!(vm, wrapping_sub)
        }
        fn run_star(vm, "*") {
            binop!(vm, wrapping_mul)
        }
        // ( dividend divisor -- quotient remainder ), truncating toward
        // zero
        fn run_divmod(vm, "divmod") {
            let divisor = vm.stack_pop()?.to_int();
            let dividend = vm.stack_pop()?.to_int();
            if divisor == 0 {
                return Err(VmError::DivisionByZero);
            }
            vm.stack_push(C::from_int(dividend.wrapping_div(divisor)))?;
            vm.stack_push(C::from_int(dividend.wrapping_rem(divisor)))?;
        }

        // Comparison; 1 is true, 0 is false
        fn run_eq(vm, "=") {
            comparator!(vm, eq)
        }
        fn run_lt(vm, "<") {
            comparator!(vm, lt)
        }
        fn run_gt(vm, ">") {
            comparator!(vm, gt)
        }
        fn run_le(vm, "<=") {
            comparator!(vm, le)
        }
        fn run_ge(vm, ">=") {
            comparator!(vm, ge)
        }

        // Logic; zero is false, anything else is true
        fn run_not(vm, "not") {
            let a = vm.stack_pop()?;
            vm.stack_push(C::from_bool(a.is_zero()))?;
        }
        fn run_and(vm, "and") {
            let n2 = vm.stack_pop()?;
            let n1 = vm.stack_pop()?;
            vm.stack_push(C::from_bool(!n1.is_zero() && !n2.is_zero()))?;
        }
        fn run_or(vm, "or") {
            let n2 = vm.stack_pop()?;
            let n1 = vm.stack_pop()?;
            vm.stack_push(C::from_bool(!n1.is_zero() || !n2.is_zero()))?;
        }

        // Stack manipulation
        fn run_dup(vm, "dup") {
            let tos = vm.stack_rget(0)?;
            vm.stack_push(tos)?;
        }
        fn run_drop(vm, "drop") {
            vm.stack_pop()?;
        }
        fn run_swap(vm, "swap") {
            let n2 = vm.stack_pop()?;
            let n1 = vm.stack_pop()?;
            vm.stack_push(n2)?;
            vm.stack_push(n1)?;
        }
        fn run_over(vm, "over") {
            let a = vm.stack_rget(1)?;
            vm.stack_push(a)?;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use crate::forth::vm::test_util::run_test;
    use crate::forth::vm::{Cell, VmError};

    #[test]
    fn arithmetic_ops() {
        assert_eq!(run_test("1 2 +").unwrap(), vec![3]);
        assert_eq!(run_test("1 2 -").unwrap(), vec![u64::from_int(-1)]);
        assert_eq!(run_test("42 dup *").unwrap(), vec![1764]);
    }

    #[test]
    fn addition_inverts_subtraction() {
        assert_eq!(run_test("1 0 +").unwrap(), vec![1]);
        assert_eq!(run_test("13 5 + 5 -").unwrap(), vec![13]);
    }

    #[test]
    fn divmod() {
        assert_eq!(run_test("10 3 divmod").unwrap(), vec![3, 1]);
        assert_eq!(
            run_test("-7 2 divmod").unwrap(),
            vec![u64::from_int(-3), u64::from_int(-1)]
        );
        assert!(matches!(
            run_test("1 0 divmod"),
            Err(VmError::DivisionByZero)
        ));
    }

    #[test]
    fn comparisons_push_one_or_zero() {
        assert_eq!(run_test("1 2 <").unwrap(), vec![1]);
        assert_eq!(run_test("2 1 <").unwrap(), vec![0]);
        assert_eq!(run_test("2 1 >").unwrap(), vec![1]);
        assert_eq!(run_test("3 3 =").unwrap(), vec![1]);
        assert_eq!(run_test("3 4 =").unwrap(), vec![0]);
        assert_eq!(run_test("3 3 <=").unwrap(), vec![1]);
        assert_eq!(run_test("4 3 <=").unwrap(), vec![0]);
        assert_eq!(run_test("3 3 >=").unwrap(), vec![1]);
        assert_eq!(run_test("-1 0 <").unwrap(), vec![1]);
    }

    #[test]
    fn logic_ops() {
        assert_eq!(run_test("0 not").unwrap(), vec![1]);
        assert_eq!(run_test("5 not").unwrap(), vec![0]);
        assert_eq!(run_test("1 2 and").unwrap(), vec![1]);
        assert_eq!(run_test("0 2 and").unwrap(), vec![0]);
        assert_eq!(run_test("0 0 or").unwrap(), vec![0]);
        assert_eq!(run_test("0 3 or").unwrap(), vec![1]);
    }

    #[test]
    fn shuffles() {
        assert_eq!(run_test("1 2 swap").unwrap(), vec![2, 1]);
        assert_eq!(run_test("1 2 over").unwrap(), vec![1, 2, 1]);
        assert_eq!(run_test("5 dup drop").unwrap(), vec![5]);
        assert_eq!(run_test("1 2 swap swap").unwrap(), vec![1, 2]);
        assert_eq!(run_test("7 8 over drop").unwrap(), vec![7, 8]);
    }

    #[test]
    fn underflow_is_reported() {
        assert!(matches!(run_test("drop"), Err(VmError::StackUnderflow)));
        assert!(matches!(run_test("1 +"), Err(VmError::StackUnderflow)));
    }
}
