macro_rules! primitives {
    (@flags) => { 0 };
    (@flags immediate) => { $crate::forth::vm::dict::IMMEDIATE_FLAG };
    ($v:ident, $(fn $fn_name:ident($vm:ident, $name:expr $(, $immediate:ident)?) $body:block)*) => {
        $(fn $fn_name<C: $crate::forth::vm::Cell, B: ::byteorder::ByteOrder>(
            $vm: &mut $crate::forth::vm::Vm<C, B>,
        ) -> ::std::result::Result<(), $crate::forth::vm::VmError> {
            $body
            Ok(())
        })*
        $($v.define($name, primitives!(@flags $($immediate)?), $fn_name);)*
    };
}
