//! The opcode table: names, numeric ids, and which ids take an operand.

/// Opcodes whose numeric id is at or above this value carry a two-byte
/// little-endian operand immediately after the opcode byte.
pub const HAS_ARG_THRESHOLD: u8 = 90;

/// A decoded opcode identity.
///
/// Ids below [`HAS_ARG_THRESHOLD`] take no operand; ids at or above it do.
/// A recognized-but-unimplemented subset of opcodes are still valid,
/// decodable ids here — see [`Opcode::is_implemented`] — so a
/// program referencing one fails at dispatch with a named
/// [`DecodeError::NotImplemented`](super::decode::DecodeError::NotImplemented)
/// rather than at decode with a generic "unknown opcode".
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // --- No operand (id < HAS_ARG_THRESHOLD) ---
    Nop = 0,
    PopTop = 1,
    RotTwo = 2,
    RotThree = 3,
    DupTop = 4,
    DupTopTwo = 5,
    UnaryPositive = 6,
    UnaryNegative = 7,
    UnaryNot = 8,
    UnaryInvert = 9,
    GetIter = 10,
    BinaryMultiply = 11,
    BinaryModulo = 12,
    BinaryAdd = 13,
    BinarySubtract = 14,
    BinarySubscr = 15,
    BinaryLshift = 16,
    BinaryRshift = 17,
    BinaryAnd = 18,
    BinaryXor = 19,
    BinaryOr = 20,
    InplacePower = 21,
    InplaceMultiply = 22,
    InplaceFloorDivide = 23,
    InplaceTrueDivide = 24,
    InplaceModulo = 25,
    InplaceAdd = 26,
    InplaceSubtract = 27,
    InplaceLshift = 28,
    InplaceRshift = 29,
    InplaceAnd = 30,
    InplaceXor = 31,
    InplaceOr = 32,
    StoreSubscr = 33,
    DeleteSubscr = 34,
    PrintExpr = 35,
    BreakLoop = 36,
    SetAdd = 37,
    ListAppend = 38,
    MapAdd = 39,
    ReturnValue = 40,
    YieldValue = 41,
    YieldFrom = 42,
    ImportStar = 43,
    PopBlock = 44,
    PopExcept = 45,
    EndFinally = 46,
    LoadBuildClass = 47,
    WithCleanup = 48,
    StoreMap = 49,

    // --- Takes a two-byte operand (id >= HAS_ARG_THRESHOLD) ---
    LoadConst = 90,
    LoadName = 91,
    StoreName = 92,
    DeleteName = 93,
    UnpackSequence = 94,
    UnpackEx = 95,
    StoreAttr = 96,
    DeleteAttr = 97,
    StoreGlobal = 98,
    DeleteGlobal = 99,
    BuildTuple = 100,
    BuildList = 101,
    BuildSet = 102,
    BuildMap = 103,
    LoadAttr = 104,
    CompareOp = 105,
    ImportName = 106,
    ImportFrom = 107,
    JumpForward = 108,
    PopJumpIfTrue = 109,
    PopJumpIfFalse = 110,
    JumpIfTrueOrPop = 111,
    JumpIfFalseOrPop = 112,
    JumpAbsolute = 113,
    ForIter = 114,
    LoadGlobal = 115,
    ContinueLoop = 116,
    SetupLoop = 117,
    SetupExcept = 118,
    SetupFinally = 119,
    SetupWith = 120,
    LoadFast = 121,
    StoreFast = 122,
    DeleteFast = 123,
    LoadClosure = 124,
    LoadDeref = 125,
    LoadClassderef = 126,
    StoreDeref = 127,
    DeleteDeref = 128,
    RaiseVarargs = 129,
    CallFunction = 130,
    MakeFunction = 131,
    MakeClosure = 132,
    BuildSlice = 133,
    ExtendedArg = 134,
    CallFunctionVar = 135,
    CallFunctionKw = 136,
    CallFunctionVarKw = 137,
    BinaryPower = 138,
    BinaryFloorDivide = 139,
    BinaryTrueDivide = 140,
}

impl Opcode {
    /// Decodes a numeric opcode id.
    #[must_use]
    pub fn from_u8(id: u8) -> Option<Self> {
        use Opcode::*;
        Some(match id {
            0 => Nop,
            1 => PopTop,
            2 => RotTwo,
            3 => RotThree,
            4 => DupTop,
            5 => DupTopTwo,
            6 => UnaryPositive,
            7 => UnaryNegative,
            8 => UnaryNot,
            9 => UnaryInvert,
            10 => GetIter,
            11 => BinaryMultiply,
            12 => BinaryModulo,
            13 => BinaryAdd,
            14 => BinarySubtract,
            15 => BinarySubscr,
            16 => BinaryLshift,
            17 => BinaryRshift,
            18 => BinaryAnd,
            19 => BinaryXor,
            20 => BinaryOr,
            21 => InplacePower,
            22 => InplaceMultiply,
            23 => InplaceFloorDivide,
            24 => InplaceTrueDivide,
            25 => InplaceModulo,
            26 => InplaceAdd,
            27 => InplaceSubtract,
            28 => InplaceLshift,
            29 => InplaceRshift,
            30 => InplaceAnd,
            31 => InplaceXor,
            32 => InplaceOr,
            33 => StoreSubscr,
            34 => DeleteSubscr,
            35 => PrintExpr,
            36 => BreakLoop,
            37 => SetAdd,
            38 => ListAppend,
            39 => MapAdd,
            40 => ReturnValue,
            41 => YieldValue,
            42 => YieldFrom,
            43 => ImportStar,
            44 => PopBlock,
            45 => PopExcept,
            46 => EndFinally,
            47 => LoadBuildClass,
            48 => WithCleanup,
            49 => StoreMap,
            90 => LoadConst,
            91 => LoadName,
            92 => StoreName,
            93 => DeleteName,
            94 => UnpackSequence,
            95 => UnpackEx,
            96 => StoreAttr,
            97 => DeleteAttr,
            98 => StoreGlobal,
            99 => DeleteGlobal,
            100 => BuildTuple,
            101 => BuildList,
            102 => BuildSet,
            103 => BuildMap,
            104 => LoadAttr,
            105 => CompareOp,
            106 => ImportName,
            107 => ImportFrom,
            108 => JumpForward,
            109 => PopJumpIfTrue,
            110 => PopJumpIfFalse,
            111 => JumpIfTrueOrPop,
            112 => JumpIfFalseOrPop,
            113 => JumpAbsolute,
            114 => ForIter,
            115 => LoadGlobal,
            116 => ContinueLoop,
            117 => SetupLoop,
            118 => SetupExcept,
            119 => SetupFinally,
            120 => SetupWith,
            121 => LoadFast,
            122 => StoreFast,
            123 => DeleteFast,
            124 => LoadClosure,
            125 => LoadDeref,
            126 => LoadClassderef,
            127 => StoreDeref,
            128 => DeleteDeref,
            129 => RaiseVarargs,
            130 => CallFunction,
            131 => MakeFunction,
            132 => MakeClosure,
            133 => BuildSlice,
            134 => ExtendedArg,
            135 => CallFunctionVar,
            136 => CallFunctionKw,
            137 => CallFunctionVarKw,
            138 => BinaryPower,
            139 => BinaryFloorDivide,
            140 => BinaryTrueDivide,
            _ => return None,
        })
    }

    /// Whether this opcode id carries a two-byte operand.
    #[must_use]
    pub fn has_arg(self) -> bool {
        (self as u8) >= HAS_ARG_THRESHOLD
    }

    /// The mnemonic used by the disassembler and the assembler.
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "NOP",
            PopTop => "POP_TOP",
            RotTwo => "ROT_TWO",
            RotThree => "ROT_THREE",
            DupTop => "DUP_TOP",
            DupTopTwo => "DUP_TOP_TWO",
            UnaryPositive => "UNARY_POSITIVE",
            UnaryNegative => "UNARY_NEGATIVE",
            UnaryNot => "UNARY_NOT",
            UnaryInvert => "UNARY_INVERT",
            GetIter => "GET_ITER",
            BinaryPower => "BINARY_POWER",
            BinaryMultiply => "BINARY_MULTIPLY",
            BinaryModulo => "BINARY_MODULO",
            BinaryAdd => "BINARY_ADD",
            BinarySubtract => "BINARY_SUBTRACT",
            BinarySubscr => "BINARY_SUBSCR",
            BinaryFloorDivide => "BINARY_FLOOR_DIVIDE",
            BinaryTrueDivide => "BINARY_TRUE_DIVIDE",
            BinaryLshift => "BINARY_LSHIFT",
            BinaryRshift => "BINARY_RSHIFT",
            BinaryAnd => "BINARY_AND",
            BinaryXor => "BINARY_XOR",
            BinaryOr => "BINARY_OR",
            InplacePower => "INPLACE_POWER",
            InplaceMultiply => "INPLACE_MULTIPLY",
            InplaceFloorDivide => "INPLACE_FLOOR_DIVIDE",
            InplaceTrueDivide => "INPLACE_TRUE_DIVIDE",
            InplaceModulo => "INPLACE_MODULO",
            InplaceAdd => "INPLACE_ADD",
            InplaceSubtract => "INPLACE_SUBTRACT",
            InplaceLshift => "INPLACE_LSHIFT",
            InplaceRshift => "INPLACE_RSHIFT",
            InplaceAnd => "INPLACE_AND",
            InplaceXor => "INPLACE_XOR",
            InplaceOr => "INPLACE_OR",
            StoreSubscr => "STORE_SUBSCR",
            DeleteSubscr => "DELETE_SUBSCR",
            PrintExpr => "PRINT_EXPR",
            BreakLoop => "BREAK_LOOP",
            ContinueLoop => "CONTINUE_LOOP",
            SetAdd => "SET_ADD",
            ListAppend => "LIST_APPEND",
            MapAdd => "MAP_ADD",
            ReturnValue => "RETURN_VALUE",
            YieldValue => "YIELD_VALUE",
            YieldFrom => "YIELD_FROM",
            ImportStar => "IMPORT_STAR",
            PopBlock => "POP_BLOCK",
            PopExcept => "POP_EXCEPT",
            EndFinally => "END_FINALLY",
            LoadBuildClass => "LOAD_BUILD_CLASS",
            SetupWith => "SETUP_WITH",
            WithCleanup => "WITH_CLEANUP",
            StoreMap => "STORE_MAP",
            LoadConst => "LOAD_CONST",
            LoadName => "LOAD_NAME",
            StoreName => "STORE_NAME",
            DeleteName => "DELETE_NAME",
            UnpackSequence => "UNPACK_SEQUENCE",
            UnpackEx => "UNPACK_EX",
            StoreAttr => "STORE_ATTR",
            DeleteAttr => "DELETE_ATTR",
            StoreGlobal => "STORE_GLOBAL",
            DeleteGlobal => "DELETE_GLOBAL",
            BuildTuple => "BUILD_TUPLE",
            BuildList => "BUILD_LIST",
            BuildSet => "BUILD_SET",
            BuildMap => "BUILD_MAP",
            LoadAttr => "LOAD_ATTR",
            CompareOp => "COMPARE_OP",
            ImportName => "IMPORT_NAME",
            ImportFrom => "IMPORT_FROM",
            JumpForward => "JUMP_FORWARD",
            PopJumpIfTrue => "POP_JUMP_IF_TRUE",
            PopJumpIfFalse => "POP_JUMP_IF_FALSE",
            JumpIfTrueOrPop => "JUMP_IF_TRUE_OR_POP",
            JumpIfFalseOrPop => "JUMP_IF_FALSE_OR_POP",
            JumpAbsolute => "JUMP_ABSOLUTE",
            ForIter => "FOR_ITER",
            LoadGlobal => "LOAD_GLOBAL",
            SetupLoop => "SETUP_LOOP",
            SetupExcept => "SETUP_EXCEPT",
            SetupFinally => "SETUP_FINALLY",
            LoadFast => "LOAD_FAST",
            StoreFast => "STORE_FAST",
            DeleteFast => "DELETE_FAST",
            LoadClosure => "LOAD_CLOSURE",
            LoadDeref => "LOAD_DEREF",
            LoadClassderef => "LOAD_CLASSDEREF",
            StoreDeref => "STORE_DEREF",
            DeleteDeref => "DELETE_DEREF",
            RaiseVarargs => "RAISE_VARARGS",
            CallFunction => "CALL_FUNCTION",
            MakeFunction => "MAKE_FUNCTION",
            MakeClosure => "MAKE_CLOSURE",
            BuildSlice => "BUILD_SLICE",
            ExtendedArg => "EXTENDED_ARG",
            CallFunctionVar => "CALL_FUNCTION_VAR",
            CallFunctionKw => "CALL_FUNCTION_KW",
            CallFunctionVarKw => "CALL_FUNCTION_VAR_KW",
        }
    }

    /// Resolves a mnemonic (`"LOAD_CONST"`, ...) back to an opcode, the
    /// assembler's inverse of [`Opcode::mnemonic`].
    #[must_use]
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        (0..=u8::MAX).find_map(|id| Opcode::from_u8(id).filter(|op| op.mnemonic() == text))
    }

    /// Whether this opcode has a working dispatch handler.
    ///
    /// `false` for the set of recognized ids with no working handler;
    /// dispatching one of these fails with a named error rather than
    /// executing nothing.
    #[must_use]
    pub fn is_implemented(self) -> bool {
        use Opcode::*;
        !matches!(
            self,
            PrintExpr
                | BreakLoop
                | ContinueLoop
                | SetAdd
                | ListAppend
                | MapAdd
                | YieldValue
                | YieldFrom
                | ImportStar
                | PopExcept
                | EndFinally
                | SetupWith
                | WithCleanup
                | DeleteName
                | UnpackSequence
                | UnpackEx
                | DeleteAttr
                | StoreGlobal
                | DeleteGlobal
                | BuildTuple
                | BuildSet
                | StoreMap
                | DeleteFast
                | LoadClosure
                | LoadDeref
                | LoadClassderef
                | StoreDeref
                | DeleteDeref
                | RaiseVarargs
                | MakeClosure
                | BuildSlice
                | ExtendedArg
                | CallFunctionVar
                | CallFunctionKw
                | CallFunctionVarKw
                | SetupExcept
                | SetupFinally
                | ImportName
                | ImportFrom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_id() {
        for id in 0..=140u8 {
            if let Some(op) = Opcode::from_u8(id) {
                assert_eq!(op as u8, id);
            }
        }
    }

    #[test]
    fn has_arg_matches_threshold() {
        assert!(!Opcode::Nop.has_arg());
        assert!(Opcode::LoadConst.has_arg());
        assert_eq!(Opcode::LoadConst as u8, HAS_ARG_THRESHOLD);
    }

    #[test]
    fn stub_opcodes_are_not_implemented() {
        assert!(!Opcode::PrintExpr.is_implemented());
        assert!(!Opcode::ImportName.is_implemented());
        assert!(Opcode::BinaryAdd.is_implemented());
    }

    #[test]
    fn from_mnemonic_round_trips() {
        assert_eq!(Opcode::from_mnemonic("LOAD_CONST"), Some(Opcode::LoadConst));
        assert_eq!(Opcode::from_mnemonic("RETURN_VALUE"), Some(Opcode::ReturnValue));
        assert_eq!(Opcode::from_mnemonic("NOT_AN_OPCODE"), None);
    }
}
