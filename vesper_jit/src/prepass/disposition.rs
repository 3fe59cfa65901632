//! Opcode dispositions: how the pre-pass treats each bytecode.
//!
//! Only a handful of bytecodes carry dedicated transfer functions; the
//! rest fall into coarse classes. Anything not listed degrades to
//! clearing all ephemeral state, which is always a sound
//! over-approximation.

use vesper_compiler::Opcode;

/// The pre-pass treatment of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A dedicated transfer function models this bytecode.
    Modeled,
    /// Conservatively wipe every ephemeral slot.
    ClearEphemeral,
    /// Wipe only the accumulator.
    ClearAccumulator,
    /// Contribute the current state to a forward jump target.
    ConditionalJump,
    /// Contribute forward, then the fallthrough is unreachable.
    UnconditionalJump,
    /// No effect on the abstract state.
    Ignored,
    /// Must never reach the analysis; aborts the compilation.
    Unreachable,
    /// Terminates abruptly; the following code is unreachable.
    Kill,
}

/// Look up the disposition of an opcode.
#[must_use]
pub fn disposition(opcode: Opcode) -> Disposition {
    use Opcode::*;
    match opcode {
        // Dedicated transfer functions.
        LdaUndefined | LdaNull | LdaTheHole | LdaTrue | LdaFalse | LdaZero | LdaSmi
        | LdaConstant | Ldar | Star | Mov | CreateClosure | GetSuperConstructor | LdaGlobal
        | LdaGlobalInsideTypeof | LdaLookupGlobalSlot | LdaLookupGlobalSlotInsideTypeof
        | StaGlobal | LdaNamedProperty | StaNamedProperty | StaNamedOwnProperty
        | LdaKeyedProperty | StaKeyedProperty | StaInArrayLiteral | TestIn | CallAnyReceiver
        | CallProperty | CallProperty0 | CallProperty1 | CallProperty2 | CallUndefinedReceiver
        | CallUndefinedReceiver0 | CallUndefinedReceiver1 | CallUndefinedReceiver2
        | CallWithSpread | Construct | ConstructWithSpread | Return | SwitchOnSmiNoFeedback => {
            Disposition::Modeled
        }

        // Operations producing an unpredictable accumulator value.
        Add | Sub | Mul | Div | Mod | Exp | BitwiseOr | BitwiseXor | BitwiseAnd | ShiftLeft
        | ShiftRight | ShiftRightLogical | Negate | BitwiseNot | Inc | Dec | TypeOf
        | LogicalNot | ToBooleanLogicalNot | ToNumber | ToNumeric | ToString | TestEqual
        | TestStrictEqual | TestLessThan | TestGreaterThan | TestLessThanOrEqual
        | TestGreaterThanOrEqual | TestInstanceOf | TestUndetectable | TestNull
        | TestUndefined | CreateEmptyArrayLiteral | CreateEmptyObjectLiteral
        | CreateArrayLiteral | CreateObjectLiteral | CreateRegExpLiteral
        | CreateMappedArguments | CreateUnmappedArguments | CreateRestParameter
        | LdaContextSlot | LdaCurrentContextSlot | LdaLookupSlot | LdaLookupContextSlot
        | DeletePropertySloppy | DeletePropertyStrict | ForInContinue | ForInNext | ForInStep => {
            Disposition::ClearAccumulator
        }

        // Operations that may write registers or run arbitrary code.
        CallRuntime | CallRuntimeForPair | InvokeIntrinsic | StaLookupSlot
        | CreateBlockContext | CreateCatchContext | CreateFunctionContext | CreateEvalContext
        | CreateWithContext | PushContext | PopContext | ForInEnumerate | ForInPrepare
        | SuspendGenerator | ResumeGenerator => Disposition::ClearEphemeral,

        // Jumps.
        JumpIfTrue | JumpIfFalse | JumpIfToBooleanTrue | JumpIfToBooleanFalse | JumpIfNull
        | JumpIfNotNull | JumpIfUndefined | JumpIfNotUndefined | JumpIfUndefinedOrNull
        | JumpIfReceiver => Disposition::ConditionalJump,
        Jump | JumpLoop => Disposition::UnconditionalJump,

        // Context stores only touch the context slot, whose hints are
        // always empty. Nop and Debugger have no dataflow effect.
        StaContextSlot | StaCurrentContextSlot | Nop | Debugger => Disposition::Ignored,

        // Abrupt termination.
        Throw | ReThrow | Abort => Disposition::Kill,

        Illegal => Disposition::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modeled_opcodes() {
        assert_eq!(disposition(Opcode::LdaSmi), Disposition::Modeled);
        assert_eq!(disposition(Opcode::Construct), Disposition::Modeled);
        assert_eq!(disposition(Opcode::Return), Disposition::Modeled);
    }

    #[test]
    fn test_jump_classes() {
        assert_eq!(disposition(Opcode::JumpIfTrue), Disposition::ConditionalJump);
        assert_eq!(disposition(Opcode::Jump), Disposition::UnconditionalJump);
        assert_eq!(disposition(Opcode::JumpLoop), Disposition::UnconditionalJump);
    }

    #[test]
    fn test_abrupt_and_invalid() {
        assert_eq!(disposition(Opcode::Throw), Disposition::Kill);
        assert_eq!(disposition(Opcode::Illegal), Disposition::Unreachable);
    }

    #[test]
    fn test_conservative_classes() {
        assert_eq!(disposition(Opcode::Add), Disposition::ClearAccumulator);
        assert_eq!(disposition(Opcode::CallRuntime), Disposition::ClearEphemeral);
        assert_eq!(disposition(Opcode::Nop), Disposition::Ignored);
    }
}
