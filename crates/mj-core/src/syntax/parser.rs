//! Parser for MiniJava source, built on a pest grammar.

use super::ast::{
    ArrayElem, BinOp, ClassDecl, Expr, ExprKind, Ident, MainClass, MethodDecl, Program, Stmt,
    StmtKind, TypeExpr, TypeExprKind, VarDecl,
};
use crate::source::{SourceId, Span};
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct MiniJavaParser;

/// Parse error with source location.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("{message} at line {line}, column {column}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
        span: Span,
    },

    #[error("integer literal `{literal}` does not fit in 32 bits")]
    IntegerOverflow { literal: String, span: Span },

    #[error("missing required element: {0}")]
    Missing(&'static str),

    #[error("unexpected {found} while parsing {expected}")]
    UnexpectedRule {
        expected: &'static str,
        found: String,
        span: Span,
    },
}

impl ParseError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax { span, .. }
            | ParseError::IntegerOverflow { span, .. }
            | ParseError::UnexpectedRule { span, .. } => Some(*span),
            ParseError::Missing(_) => None,
        }
    }
}

fn syntax_error(err: pest::error::Error<Rule>, source_id: SourceId) -> ParseError {
    let err = err.renamed_rules(|rule| {
        match rule {
            Rule::ident => "identifier",
            Rule::expr => "expression",
            Rule::stmt => "statement",
            Rule::ty => "type",
            Rule::var_decl => "variable declaration",
            Rule::method_decl => "method declaration",
            Rule::class_decl => "class declaration",
            Rule::primary | Rule::clause => "operand",
            Rule::EOI => "end of input",
            other => return format!("{:?}", other),
        }
        .to_string()
    });
    let (line, column) = match err.line_col {
        pest::error::LineColLocation::Pos(pos) => pos,
        pest::error::LineColLocation::Span(start, _) => start,
    };
    let (start, end) = match err.location {
        pest::error::InputLocation::Pos(pos) => (pos, pos + 1),
        pest::error::InputLocation::Span(span) => span,
    };
    ParseError::Syntax {
        message: err.variant.message().to_string(),
        line,
        column,
        span: Span::new(source_id, start, end),
    }
}

/// Parse a compilation unit with a default source id.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    parse_with_source_id(source, SourceId::default())
}

/// Parse a compilation unit, tagging every span with `source_id`.
pub fn parse_with_source_id(source: &str, source_id: SourceId) -> Result<Program, ParseError> {
    let mut pairs = MiniJavaParser::parse(Rule::program, source)
        .map_err(|err| syntax_error(err, source_id))?;
    let program = pairs.next().ok_or(ParseError::Missing("program"))?;
    ParserContext { source_id }.program(program)
}

fn next<'i>(pairs: &mut Pairs<'i, Rule>, what: &'static str) -> Result<Pair<'i, Rule>, ParseError> {
    pairs.next().ok_or(ParseError::Missing(what))
}

struct ParserContext {
    source_id: SourceId,
}

impl ParserContext {
    fn span(&self, pair: &Pair<Rule>) -> Span {
        let span = pair.as_span();
        Span::new(self.source_id, span.start(), span.end())
    }

    fn ident(&self, pair: Pair<Rule>) -> Ident {
        Ident::new(pair.as_str(), self.span(&pair))
    }

    fn unexpected(&self, expected: &'static str, pair: &Pair<Rule>) -> ParseError {
        ParseError::UnexpectedRule {
            expected,
            found: format!("{:?}", pair.as_rule()),
            span: self.span(pair),
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn program(&self, pair: Pair<Rule>) -> Result<Program, ParseError> {
        let mut main = None;
        let mut classes = Vec::new();

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::main_class => main = Some(self.main_class(inner)?),
                Rule::class_decl => classes.push(self.class_decl(inner)?),
                _ => {}
            }
        }

        Ok(Program {
            main: main.ok_or(ParseError::Missing("main class"))?,
            classes,
        })
    }

    fn main_class(&self, pair: Pair<Rule>) -> Result<MainClass, ParseError> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();
        let name = self.ident(next(&mut inner, "main class name")?);
        let arg = self.ident(next(&mut inner, "main argument name")?);

        let mut locals = Vec::new();
        let mut body = Vec::new();
        for item in inner {
            match item.as_rule() {
                Rule::var_decl => locals.push(self.var_decl(item)?),
                Rule::stmt => body.push(self.stmt(item)?),
                _ => return Err(self.unexpected("main method body", &item)),
            }
        }

        Ok(MainClass {
            name,
            arg,
            locals,
            body,
            span,
        })
    }

    fn class_decl(&self, pair: Pair<Rule>) -> Result<ClassDecl, ParseError> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();
        let name = self.ident(next(&mut inner, "class name")?);

        let mut parent = None;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        for item in inner {
            match item.as_rule() {
                Rule::extends_clause => {
                    let mut clause = item.into_inner();
                    parent = Some(self.ident(next(&mut clause, "parent class name")?));
                }
                Rule::var_decl => fields.push(self.var_decl(item)?),
                Rule::method_decl => methods.push(self.method_decl(item)?),
                _ => return Err(self.unexpected("class body", &item)),
            }
        }

        Ok(ClassDecl {
            name,
            parent,
            fields,
            methods,
            span,
        })
    }

    fn var_decl(&self, pair: Pair<Rule>) -> Result<VarDecl, ParseError> {
        let mut inner = pair.into_inner();
        let ty = self.ty(next(&mut inner, "variable type")?)?;
        let name = self.ident(next(&mut inner, "variable name")?);
        Ok(VarDecl { ty, name })
    }

    fn method_decl(&self, pair: Pair<Rule>) -> Result<MethodDecl, ParseError> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();
        let ret = self.ty(next(&mut inner, "return type")?)?;
        let name = self.ident(next(&mut inner, "method name")?);

        let mut params = Vec::new();
        let mut locals = Vec::new();
        let mut body = Vec::new();
        let mut ret_expr = None;
        for item in inner {
            match item.as_rule() {
                Rule::param_list => {
                    for param in item.into_inner() {
                        params.push(self.var_decl(param)?);
                    }
                }
                Rule::var_decl => locals.push(self.var_decl(item)?),
                Rule::stmt => body.push(self.stmt(item)?),
                Rule::expr => ret_expr = Some(self.expr(item)?),
                _ => return Err(self.unexpected("method body", &item)),
            }
        }

        Ok(MethodDecl {
            ret,
            name,
            params,
            locals,
            body,
            ret_expr: ret_expr.ok_or(ParseError::Missing("return expression"))?,
            span,
        })
    }

    fn ty(&self, pair: Pair<Rule>) -> Result<TypeExpr, ParseError> {
        let span = self.span(&pair);
        let inner = next(&mut pair.into_inner(), "type")?;
        let kind = match inner.as_rule() {
            Rule::int_array_ty => TypeExprKind::IntArray,
            Rule::boolean_array_ty => TypeExprKind::BooleanArray,
            Rule::boolean_ty => TypeExprKind::Boolean,
            Rule::int_ty => TypeExprKind::Int,
            Rule::class_ty => TypeExprKind::Class(inner.as_str().to_string()),
            _ => return Err(self.unexpected("type", &inner)),
        };
        Ok(TypeExpr { kind, span })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmt(&self, pair: Pair<Rule>) -> Result<Stmt, ParseError> {
        let span = self.span(&pair);
        let inner = next(&mut pair.into_inner(), "statement")?;
        let rule = inner.as_rule();
        let mut parts = inner.into_inner();

        let kind = match rule {
            Rule::block => StmtKind::Block(parts.map(|s| self.stmt(s)).collect::<Result<_, _>>()?),
            Rule::assign_stmt => StmtKind::Assign {
                target: self.ident(next(&mut parts, "assignment target")?),
                value: self.expr(next(&mut parts, "assigned value")?)?,
            },
            Rule::array_assign_stmt => StmtKind::ArrayAssign {
                target: self.ident(next(&mut parts, "array name")?),
                index: self.expr(next(&mut parts, "array index")?)?,
                value: self.expr(next(&mut parts, "assigned value")?)?,
            },
            Rule::if_stmt => StmtKind::If {
                cond: self.expr(next(&mut parts, "if condition")?)?,
                then_branch: Box::new(self.stmt(next(&mut parts, "then branch")?)?),
                else_branch: Box::new(self.stmt(next(&mut parts, "else branch")?)?),
            },
            Rule::while_stmt => StmtKind::While {
                cond: self.expr(next(&mut parts, "while condition")?)?,
                body: Box::new(self.stmt(next(&mut parts, "loop body")?)?),
            },
            Rule::print_stmt => StmtKind::Print(self.expr(next(&mut parts, "printed value")?)?),
            _ => {
                return Err(ParseError::UnexpectedRule {
                    expected: "statement",
                    found: format!("{:?}", rule),
                    span,
                })
            }
        };

        Ok(Stmt { kind, span })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&self, pair: Pair<Rule>) -> Result<Expr, ParseError> {
        let span = self.span(&pair);
        let mut inner = pair.into_inner();
        let head = next(&mut inner, "expression")?;
        let lhs = match head.as_rule() {
            Rule::not_expr => self.not_expr(head)?,
            Rule::primary => self.primary(head)?,
            _ => return Err(self.unexpected("expression", &head)),
        };

        match inner.next() {
            Some(tail) => self.expr_tail(lhs, tail, span),
            None => Ok(lhs),
        }
    }

    fn expr_tail(&self, lhs: Expr, tail: Pair<Rule>, span: Span) -> Result<Expr, ParseError> {
        let rule = tail.as_rule();
        let mut parts = tail.into_inner();
        let lhs = Box::new(lhs);

        let op = match rule {
            Rule::and_tail => Some(BinOp::And),
            Rule::compare_tail => Some(BinOp::Less),
            Rule::plus_tail => Some(BinOp::Add),
            Rule::minus_tail => Some(BinOp::Sub),
            Rule::times_tail => Some(BinOp::Mul),
            _ => None,
        };
        if let Some(op) = op {
            let operand = next(&mut parts, "right operand")?;
            let rhs = match op {
                BinOp::And => self.clause(operand)?,
                _ => self.primary(operand)?,
            };
            let kind = ExprKind::Binary {
                op,
                lhs,
                rhs: Box::new(rhs),
            };
            return Ok(Expr::new(kind, span));
        }

        let kind = match rule {
            Rule::lookup_tail => ExprKind::Index {
                array: lhs,
                index: Box::new(self.primary(next(&mut parts, "array index")?)?),
            },
            Rule::call_tail => {
                let method = self.ident(next(&mut parts, "method name")?);
                let args = match parts.next() {
                    Some(list) => list
                        .into_inner()
                        .map(|arg| self.expr(arg))
                        .collect::<Result<_, _>>()?,
                    None => Vec::new(),
                };
                ExprKind::Call {
                    receiver: lhs,
                    method,
                    args,
                }
            }
            Rule::length_tail => ExprKind::Length(lhs),
            _ => {
                return Err(ParseError::UnexpectedRule {
                    expected: "expression tail",
                    found: format!("{:?}", rule),
                    span,
                })
            }
        };

        Ok(Expr::new(kind, span))
    }

    fn clause(&self, pair: Pair<Rule>) -> Result<Expr, ParseError> {
        let inner = next(&mut pair.into_inner(), "clause")?;
        match inner.as_rule() {
            Rule::not_expr => self.not_expr(inner),
            Rule::primary => self.primary(inner),
            _ => Err(self.unexpected("clause", &inner)),
        }
    }

    fn not_expr(&self, pair: Pair<Rule>) -> Result<Expr, ParseError> {
        let span = self.span(&pair);
        let operand = self.clause(next(&mut pair.into_inner(), "negated operand")?)?;
        Ok(Expr::new(ExprKind::Not(Box::new(operand)), span))
    }

    fn primary(&self, pair: Pair<Rule>) -> Result<Expr, ParseError> {
        let span = self.span(&pair);
        let inner = next(&mut pair.into_inner(), "operand")?;

        let kind = match inner.as_rule() {
            Rule::int_lit => {
                let literal = inner.as_str();
                let value = literal
                    .parse::<i32>()
                    .map_err(|_| ParseError::IntegerOverflow {
                        literal: literal.to_string(),
                        span,
                    })?;
                ExprKind::IntLit(value)
            }
            Rule::true_lit => ExprKind::BoolLit(true),
            Rule::false_lit => ExprKind::BoolLit(false),
            Rule::this_expr => ExprKind::This,
            Rule::ident => ExprKind::Ident(inner.as_str().to_string()),
            Rule::new_int_array | Rule::new_boolean_array => {
                let elem = if inner.as_rule() == Rule::new_int_array {
                    ArrayElem::Int
                } else {
                    ArrayElem::Boolean
                };
                let len = self.expr(next(&mut inner.into_inner(), "array length")?)?;
                ExprKind::NewArray {
                    elem,
                    len: Box::new(len),
                }
            }
            Rule::new_object => {
                ExprKind::New(self.ident(next(&mut inner.into_inner(), "class name")?))
            }
            Rule::paren_expr => return self.expr(next(&mut inner.into_inner(), "expression")?),
            _ => return Err(self.unexpected("operand", &inner)),
        };

        Ok(Expr::new(kind, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTORIAL: &str = r#"
        class Factorial {
            public static void main(String[] a) {
                System.out.println(new Fac().ComputeFac(10));
            }
        }

        class Fac {
            public int ComputeFac(int num) {
                int num_aux;
                if (num < 1)
                    num_aux = 1;
                else
                    num_aux = num * (this.ComputeFac(num - 1));
                return num_aux;
            }
        }
    "#;

    #[test]
    fn test_parse_factorial() {
        let program = parse(FACTORIAL).unwrap();

        assert_eq!(program.main.name.as_str(), "Factorial");
        assert_eq!(program.main.arg.as_str(), "a");
        assert_eq!(program.main.body.len(), 1);
        assert_eq!(program.classes.len(), 1);

        let fac = &program.classes[0];
        assert_eq!(fac.name.as_str(), "Fac");
        assert!(fac.parent.is_none());
        assert_eq!(fac.methods.len(), 1);

        let method = &fac.methods[0];
        assert_eq!(method.name.as_str(), "ComputeFac");
        assert_eq!(method.ret.kind, TypeExprKind::Int);
        assert_eq!(method.params.len(), 1);
        assert_eq!(method.locals.len(), 1);
        assert!(matches!(method.ret_expr.kind, ExprKind::Ident(ref n) if n == "num_aux"));
    }

    #[test]
    fn test_parse_print_of_call_on_allocation() {
        let program = parse(FACTORIAL).unwrap();
        let StmtKind::Print(expr) = &program.main.body[0].kind else {
            panic!("expected print statement");
        };
        let ExprKind::Call { receiver, method, args } = &expr.kind else {
            panic!("expected call, got {:?}", expr.kind);
        };
        assert!(matches!(&receiver.kind, ExprKind::New(class) if class.as_str() == "Fac"));
        assert_eq!(method.as_str(), "ComputeFac");
        assert!(matches!(args[0].kind, ExprKind::IntLit(10)));
    }

    #[test]
    fn test_parse_extends_and_all_types() {
        let source = r#"
            class Main { public static void main(String[] args) { } }
            class Base { int a; boolean b; int[] c; boolean [ ] d; Base e; }
            class Derived extends Base { }
        "#;
        let program = parse(source).unwrap();
        let kinds: Vec<_> = program.classes[0]
            .fields
            .iter()
            .map(|f| f.ty.kind.clone())
            .collect();

        assert_eq!(
            kinds,
            vec![
                TypeExprKind::Int,
                TypeExprKind::Boolean,
                TypeExprKind::IntArray,
                TypeExprKind::BooleanArray,
                TypeExprKind::Class("Base".into()),
            ]
        );
        assert_eq!(program.classes[1].parent.as_ref().unwrap().as_str(), "Base");
    }

    #[test]
    fn test_keyword_prefixed_identifiers() {
        let source = r#"
            class Main {
                public static void main(String[] args) {
                    integer thisOne;
                    boolean trueish;
                    trueish = !falsey && newer;
                    ifx = thisOne;
                }
            }
        "#;
        let program = parse(source).unwrap();
        assert_eq!(
            program.main.locals[0].ty.kind,
            TypeExprKind::Class("integer".into())
        );
        assert_eq!(program.main.locals[1].name.as_str(), "trueish");

        let StmtKind::Assign { value, .. } = &program.main.body[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { op, lhs, rhs } = &value.kind else {
            panic!("expected binary expression");
        };
        assert_eq!(*op, BinOp::And);
        assert!(matches!(&lhs.kind, ExprKind::Not(inner) if matches!(&inner.kind, ExprKind::Ident(n) if n == "falsey")));
        assert!(matches!(&rhs.kind, ExprKind::Ident(n) if n == "newer"));

        let StmtKind::Assign { target, .. } = &program.main.body[1].kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.as_str(), "ifx");
    }

    #[test]
    fn test_parse_expression_forms() {
        let source = r#"
            class Main {
                public static void main(String[] args) {
                    a = b[c];
                    a = b.length;
                    a = new boolean[(x + 1)];
                    a[i] = (a.foo(1, true, this)) - 2;
                    while (x < y) { }
                }
            }
        "#;
        let program = parse(source).unwrap();
        let body = &program.main.body;
        let value = |i: usize| match &body[i].kind {
            StmtKind::Assign { value, .. } | StmtKind::ArrayAssign { value, .. } => value.clone(),
            other => panic!("unexpected statement {:?}", other),
        };

        assert!(matches!(value(0).kind, ExprKind::Index { .. }));
        assert!(matches!(value(1).kind, ExprKind::Length(_)));
        assert!(matches!(
            value(2).kind,
            ExprKind::NewArray { elem: ArrayElem::Boolean, .. }
        ));
        let ExprKind::Binary { op: BinOp::Sub, lhs, .. } = value(3).kind else {
            panic!("expected subtraction");
        };
        assert!(matches!(&lhs.kind, ExprKind::Call { args, .. } if args.len() == 3));
        assert!(matches!(body[4].kind, StmtKind::While { .. }));
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = r#"
            // entry point
            class Main {
                /* the only
                   method */
                public static void main(String[] args) {
                    System.out.println(1); // trailing
                }
            }
        "#;
        assert!(parse(source).is_ok());
    }

    #[test]
    fn test_if_requires_else() {
        let source = r#"
            class Main {
                public static void main(String[] args) {
                    if (true) System.out.println(1);
                }
            }
        "#;
        let err = parse(source).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }), "{err}");
        assert!(err.span().is_some());
    }

    #[test]
    fn test_chained_operators_are_rejected() {
        let source = r#"
            class Main {
                public static void main(String[] args) {
                    System.out.println(1 + 2 + 3);
                }
            }
        "#;
        assert!(matches!(parse(source), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_integer_literal_overflow() {
        let source = r#"
            class Main {
                public static void main(String[] args) {
                    System.out.println(2147483648);
                }
            }
        "#;
        let err = parse(source).unwrap_err();
        assert!(matches!(err, ParseError::IntegerOverflow { ref literal, .. } if literal == "2147483648"));
        assert!(err.span().is_some());
    }

    #[test]
    fn test_spans_carry_source_id() {
        let source = "class M { public static void main(String[] a) { } }";
        let program = parse_with_source_id(source, SourceId(7)).unwrap();
        assert_eq!(program.main.name.span, Span::new(SourceId(7), 6, 7));
    }
}
