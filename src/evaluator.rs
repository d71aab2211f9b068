use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::ast::Expr;
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::value::{Function, Value};

/// Runs a whole program: a fresh program-global frame is chained onto the
/// given root environment (normally the prelude) and the program evaluates
/// inside it.
pub fn run(root: Rc<RefCell<Environment>>, program: &Expr) -> Result<Value, RuntimeError> {
    debug!("evaluating program");
    let global = Rc::new(RefCell::new(Environment::new_enclosed(root)));
    evaluate(program, &global)
}

/// Evaluates one node against an environment chain. The only state is the
/// chain itself, threaded through the recursion.
pub fn evaluate(expr: &Expr, env: &Rc<RefCell<Environment>>) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Literal { value, .. } => Ok(value.clone()),

        Expr::ArrayLiteral { elements, .. } => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(evaluate(element, env)?);
            }
            // fresh backing storage, never aliased with the sources
            Ok(Value::array(items))
        }

        Expr::Variable { pos, name } => match env.borrow().get(name) {
            Some(value) => Ok(value),
            None => Err(RuntimeError::unbound(*pos, name)),
        },

        Expr::Lambda { params, body, .. } => Ok(Value::Function(close_over(params, body, env))),

        Expr::Apply { pos, func, args } => {
            let callee = evaluate(func, env)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, env)?);
            }
            match callee {
                // The one place positions are attached to escaping errors:
                // whatever fails inside the call resurfaces at the call
                // site, keeping the inner rendering as the message.
                Value::Function(function) => function
                    .call(values)
                    .map_err(|err| RuntimeError::new(Some(*pos), err.to_string())),
                _ => Err(RuntimeError::invalid_application(*pos)),
            }
        }

        Expr::Block { body, .. } => {
            let mut result = Value::Void;
            for expr in body {
                result = evaluate(expr, env)?;
            }
            Ok(result)
        }

        Expr::Declaration { name, value, .. } => {
            let value = evaluate(value, env)?;
            env.borrow_mut().define(name.clone(), value.clone());
            Ok(value)
        }

        Expr::If {
            pos,
            test,
            consequent,
            alternative,
        } => match evaluate(test, env)? {
            Value::Boolean(true) => evaluate(consequent, env),
            Value::Boolean(false) => match alternative {
                Some(alternative) => evaluate(alternative, env),
                None => Ok(Value::Void),
            },
            other => Err(RuntimeError::type_mismatch("boolean", other.type_name()).at(*pos)),
        },

        Expr::While { pos, test, body } => {
            let mut result = Value::Void;
            loop {
                match evaluate(test, env)? {
                    Value::Boolean(true) => result = evaluate(body, env)?,
                    Value::Boolean(false) => return Ok(result),
                    other => {
                        return Err(
                            RuntimeError::type_mismatch("boolean", other.type_name()).at(*pos)
                        )
                    }
                }
            }
        }
    }
}

/// Builds the closure for a lambda. A call gets a fresh frame parented on
/// the environment captured here (the definition site, not the call site);
/// `arguments` is always bound to an array of everything supplied, missing
/// parameters bind to Void, and extras are reachable only via `arguments`.
fn close_over(
    params: &Rc<Vec<String>>,
    body: &Rc<Expr>,
    env: &Rc<RefCell<Environment>>,
) -> Function {
    let params = Rc::clone(params);
    let body = Rc::clone(body);
    let captured = Rc::clone(env);
    Function::new(move |args: Vec<Value>| {
        let mut frame = Environment::new_enclosed(Rc::clone(&captured));
        frame.define("arguments", Value::array(args.clone()));
        for (i, name) in params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or(Value::Void);
            frame.define(name.clone(), value);
        }
        evaluate(&body, &Rc::new(RefCell::new(frame)))
    })
}
