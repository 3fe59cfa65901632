//! Opcode enumeration for the Vesper register+accumulator machine.
//!
//! Operand signatures are noted per opcode using the shorthand
//! `reg` (register), `imm` (signed immediate), `idx` (constant-pool index),
//! `slot` (feedback slot), `count` (register-range length), `jump`
//! (target offset), `table` (jump-table index).

use std::fmt;

/// One bytecode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // -------------------------------------------------------------------------
    // Accumulator loads
    // -------------------------------------------------------------------------
    /// Load `undefined` into the accumulator.
    LdaUndefined,
    /// Load `null` into the accumulator.
    LdaNull,
    /// Load the hole marker into the accumulator.
    LdaTheHole,
    /// Load `true` into the accumulator.
    LdaTrue,
    /// Load `false` into the accumulator.
    LdaFalse,
    /// Load the small integer 0 into the accumulator.
    LdaZero,
    /// `imm` — load a small integer into the accumulator.
    LdaSmi,
    /// `idx` — load a constant-pool entry into the accumulator.
    LdaConstant,

    // -------------------------------------------------------------------------
    // Register moves
    // -------------------------------------------------------------------------
    /// `reg` — copy a register into the accumulator.
    Ldar,
    /// `reg` — copy the accumulator into a register.
    Star,
    /// `reg, reg` — copy register to register.
    Mov,

    // -------------------------------------------------------------------------
    // Globals
    // -------------------------------------------------------------------------
    /// `idx, slot` — load a global by name.
    LdaGlobal,
    /// `idx, slot` — load a global by name inside `typeof`.
    LdaGlobalInsideTypeof,
    /// `idx, slot` — dynamic lookup ending at the global object.
    LdaLookupGlobalSlot,
    /// `idx, slot` — dynamic lookup ending at the global object, in `typeof`.
    LdaLookupGlobalSlotInsideTypeof,
    /// `idx, slot` — store the accumulator to a global by name.
    StaGlobal,

    // -------------------------------------------------------------------------
    // Context slots
    // -------------------------------------------------------------------------
    /// `reg, imm, imm` — load from a context slot.
    LdaContextSlot,
    /// `imm` — load from the current context.
    LdaCurrentContextSlot,
    /// `reg, imm, imm` — store to a context slot.
    StaContextSlot,
    /// `imm` — store to the current context.
    StaCurrentContextSlot,
    /// `idx` — dynamic slot lookup by name.
    LdaLookupSlot,
    /// `idx, imm, imm` — dynamic context slot lookup by name.
    LdaLookupContextSlot,
    /// `idx` — dynamic slot store by name.
    StaLookupSlot,

    // -------------------------------------------------------------------------
    // Property access
    // -------------------------------------------------------------------------
    /// `reg, idx, slot` — load a named property of a register.
    LdaNamedProperty,
    /// `reg, idx, slot` — store the accumulator to a named property.
    StaNamedProperty,
    /// `reg, idx, slot` — define an own named property (literal init).
    StaNamedOwnProperty,
    /// `reg, slot` — load receiver[accumulator].
    LdaKeyedProperty,
    /// `reg, reg, slot` — store the accumulator to receiver[key].
    StaKeyedProperty,
    /// `reg, reg, slot` — array-literal element store.
    StaInArrayLiteral,
    /// `reg, slot` — `key in accumulator` membership test.
    TestIn,
    /// `reg` — delete a property, sloppy mode.
    DeletePropertySloppy,
    /// `reg` — delete a property, strict mode.
    DeletePropertyStrict,

    // -------------------------------------------------------------------------
    // Closures and constructors
    // -------------------------------------------------------------------------
    /// `idx, imm` — instantiate a closure from a function-info constant and a
    /// closure feedback cell.
    CreateClosure,
    /// `reg` — resolve the parent constructor of the accumulator into a register.
    GetSuperConstructor,

    // -------------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------------
    /// `reg, reg, count, slot` — call with an explicit receiver range.
    CallAnyReceiver,
    /// `reg, reg, count, slot` — property call, receiver in range.
    CallProperty,
    /// `reg, reg, slot` — property call with zero arguments.
    CallProperty0,
    /// `reg, reg, reg, slot` — property call with one argument.
    CallProperty1,
    /// `reg, reg, reg, reg, slot` — property call with two arguments.
    CallProperty2,
    /// `reg, reg, count, slot` — call with the undefined receiver.
    CallUndefinedReceiver,
    /// `reg, slot` — undefined-receiver call with zero arguments.
    CallUndefinedReceiver0,
    /// `reg, reg, slot` — undefined-receiver call with one argument.
    CallUndefinedReceiver1,
    /// `reg, reg, reg, slot` — undefined-receiver call with two arguments.
    CallUndefinedReceiver2,
    /// `reg, reg, count, slot` — call with a spread in the last argument.
    CallWithSpread,
    /// `imm, reg, count` — call a runtime function.
    CallRuntime,
    /// `imm, reg, count, reg` — call a runtime function returning a pair.
    CallRuntimeForPair,
    /// `imm, reg, count` — invoke an interpreter intrinsic.
    InvokeIntrinsic,
    /// `reg, reg, count, slot` — construct; new target in the accumulator.
    Construct,
    /// `reg, reg, count, slot` — construct with a spread in the last argument.
    ConstructWithSpread,

    // -------------------------------------------------------------------------
    // Unary and binary operators
    // -------------------------------------------------------------------------
    /// `reg, slot` — add register and accumulator.
    Add,
    /// `reg, slot` — subtract.
    Sub,
    /// `reg, slot` — multiply.
    Mul,
    /// `reg, slot` — divide.
    Div,
    /// `reg, slot` — modulus.
    Mod,
    /// `reg, slot` — exponentiate.
    Exp,
    /// `reg, slot` — bitwise or.
    BitwiseOr,
    /// `reg, slot` — bitwise xor.
    BitwiseXor,
    /// `reg, slot` — bitwise and.
    BitwiseAnd,
    /// `reg, slot` — shift left.
    ShiftLeft,
    /// `reg, slot` — arithmetic shift right.
    ShiftRight,
    /// `reg, slot` — logical shift right.
    ShiftRightLogical,
    /// `slot` — arithmetic negate of the accumulator.
    Negate,
    /// `slot` — bitwise not of the accumulator.
    BitwiseNot,
    /// `slot` — increment the accumulator.
    Inc,
    /// `slot` — decrement the accumulator.
    Dec,
    /// `typeof` of the accumulator.
    TypeOf,
    /// Boolean negation of the accumulator.
    LogicalNot,
    /// Boolean coercion plus negation.
    ToBooleanLogicalNot,
    /// Numeric coercion of the accumulator.
    ToNumber,
    /// Numeric-or-bigint coercion of the accumulator.
    ToNumeric,
    /// String coercion of the accumulator.
    ToString,

    // -------------------------------------------------------------------------
    // Comparisons
    // -------------------------------------------------------------------------
    /// `reg, slot` — abstract equality.
    TestEqual,
    /// `reg, slot` — strict equality.
    TestStrictEqual,
    /// `reg, slot` — less than.
    TestLessThan,
    /// `reg, slot` — greater than.
    TestGreaterThan,
    /// `reg, slot` — less than or equal.
    TestLessThanOrEqual,
    /// `reg, slot` — greater than or equal.
    TestGreaterThanOrEqual,
    /// `reg, slot` — `instanceof`.
    TestInstanceOf,
    /// Undetectable test on the accumulator.
    TestUndetectable,
    /// Null test on the accumulator.
    TestNull,
    /// Undefined test on the accumulator.
    TestUndefined,

    // -------------------------------------------------------------------------
    // Literals and arguments objects
    // -------------------------------------------------------------------------
    /// `slot` — allocate an empty array literal.
    CreateEmptyArrayLiteral,
    /// Allocate an empty object literal.
    CreateEmptyObjectLiteral,
    /// `idx, slot, imm` — allocate an array literal from a boilerplate.
    CreateArrayLiteral,
    /// `idx, slot, imm` — allocate an object literal from a boilerplate.
    CreateObjectLiteral,
    /// `idx, slot, imm` — materialize a regexp literal.
    CreateRegExpLiteral,
    /// Allocate a mapped arguments object.
    CreateMappedArguments,
    /// Allocate an unmapped arguments object.
    CreateUnmappedArguments,
    /// Allocate a rest-parameter array.
    CreateRestParameter,

    // -------------------------------------------------------------------------
    // Contexts
    // -------------------------------------------------------------------------
    /// `idx` — allocate a block context.
    CreateBlockContext,
    /// `reg, idx` — allocate a catch context.
    CreateCatchContext,
    /// `idx, imm` — allocate a function context.
    CreateFunctionContext,
    /// `idx, imm` — allocate an eval context.
    CreateEvalContext,
    /// `reg, idx` — allocate a with context.
    CreateWithContext,
    /// `reg` — push the accumulator as the current context.
    PushContext,
    /// `reg` — restore a saved context.
    PopContext,

    // -------------------------------------------------------------------------
    // For-in
    // -------------------------------------------------------------------------
    /// `reg` — prepare for-in state from the accumulator.
    ForInEnumerate,
    /// `reg, slot` — populate the for-in state triple.
    ForInPrepare,
    /// `reg, reg` — for-in loop continuation test.
    ForInContinue,
    /// `reg, reg, reg, slot` — load the next enumerated key.
    ForInNext,
    /// `reg` — advance the for-in index.
    ForInStep,

    // -------------------------------------------------------------------------
    // Generators
    // -------------------------------------------------------------------------
    /// `reg, reg, count, imm` — suspend the current generator.
    SuspendGenerator,
    /// `reg, reg, count` — resume a generator; revives dead dataflow state.
    ResumeGenerator,

    // -------------------------------------------------------------------------
    // Control flow
    // -------------------------------------------------------------------------
    /// `jump` — unconditional jump.
    Jump,
    /// `jump` — back edge of a loop.
    JumpLoop,
    /// `jump` — jump if the accumulator is `true`.
    JumpIfTrue,
    /// `jump` — jump if the accumulator is `false`.
    JumpIfFalse,
    /// `jump` — jump if the accumulator coerces to `true`.
    JumpIfToBooleanTrue,
    /// `jump` — jump if the accumulator coerces to `false`.
    JumpIfToBooleanFalse,
    /// `jump` — jump if the accumulator is `null`.
    JumpIfNull,
    /// `jump` — jump if the accumulator is not `null`.
    JumpIfNotNull,
    /// `jump` — jump if the accumulator is `undefined`.
    JumpIfUndefined,
    /// `jump` — jump if the accumulator is not `undefined`.
    JumpIfNotUndefined,
    /// `jump` — jump if the accumulator is `undefined` or `null`.
    JumpIfUndefinedOrNull,
    /// `jump` — jump if the accumulator is an object receiver.
    JumpIfReceiver,
    /// `table` — dispatch on a small-integer accumulator.
    SwitchOnSmiNoFeedback,
    /// Return the accumulator to the caller.
    Return,
    /// Throw the accumulator.
    Throw,
    /// Re-throw a caught exception.
    ReThrow,
    /// `imm` — abort execution with a bailout reason.
    Abort,

    // -------------------------------------------------------------------------
    // Miscellaneous
    // -------------------------------------------------------------------------
    /// No operation.
    Nop,
    /// Debugger breakpoint.
    Debugger,
    /// Never valid in a bytecode stream.
    Illegal,
}

macro_rules! opcode_names {
    ($($variant:ident),* $(,)?) => {
        impl Opcode {
            /// Printable opcode mnemonic.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

opcode_names!(
    LdaUndefined,
    LdaNull,
    LdaTheHole,
    LdaTrue,
    LdaFalse,
    LdaZero,
    LdaSmi,
    LdaConstant,
    Ldar,
    Star,
    Mov,
    LdaGlobal,
    LdaGlobalInsideTypeof,
    LdaLookupGlobalSlot,
    LdaLookupGlobalSlotInsideTypeof,
    StaGlobal,
    LdaContextSlot,
    LdaCurrentContextSlot,
    StaContextSlot,
    StaCurrentContextSlot,
    LdaLookupSlot,
    LdaLookupContextSlot,
    StaLookupSlot,
    LdaNamedProperty,
    StaNamedProperty,
    StaNamedOwnProperty,
    LdaKeyedProperty,
    StaKeyedProperty,
    StaInArrayLiteral,
    TestIn,
    DeletePropertySloppy,
    DeletePropertyStrict,
    CreateClosure,
    GetSuperConstructor,
    CallAnyReceiver,
    CallProperty,
    CallProperty0,
    CallProperty1,
    CallProperty2,
    CallUndefinedReceiver,
    CallUndefinedReceiver0,
    CallUndefinedReceiver1,
    CallUndefinedReceiver2,
    CallWithSpread,
    CallRuntime,
    CallRuntimeForPair,
    InvokeIntrinsic,
    Construct,
    ConstructWithSpread,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    ShiftLeft,
    ShiftRight,
    ShiftRightLogical,
    Negate,
    BitwiseNot,
    Inc,
    Dec,
    TypeOf,
    LogicalNot,
    ToBooleanLogicalNot,
    ToNumber,
    ToNumeric,
    ToString,
    TestEqual,
    TestStrictEqual,
    TestLessThan,
    TestGreaterThan,
    TestLessThanOrEqual,
    TestGreaterThanOrEqual,
    TestInstanceOf,
    TestUndetectable,
    TestNull,
    TestUndefined,
    CreateEmptyArrayLiteral,
    CreateEmptyObjectLiteral,
    CreateArrayLiteral,
    CreateObjectLiteral,
    CreateRegExpLiteral,
    CreateMappedArguments,
    CreateUnmappedArguments,
    CreateRestParameter,
    CreateBlockContext,
    CreateCatchContext,
    CreateFunctionContext,
    CreateEvalContext,
    CreateWithContext,
    PushContext,
    PopContext,
    ForInEnumerate,
    ForInPrepare,
    ForInContinue,
    ForInNext,
    ForInStep,
    SuspendGenerator,
    ResumeGenerator,
    Jump,
    JumpLoop,
    JumpIfTrue,
    JumpIfFalse,
    JumpIfToBooleanTrue,
    JumpIfToBooleanFalse,
    JumpIfNull,
    JumpIfNotNull,
    JumpIfUndefined,
    JumpIfNotUndefined,
    JumpIfUndefinedOrNull,
    JumpIfReceiver,
    SwitchOnSmiNoFeedback,
    Return,
    Throw,
    ReThrow,
    Abort,
    Nop,
    Debugger,
    Illegal,
);

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
