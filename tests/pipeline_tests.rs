// tests/pipeline_tests.rs

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use retext::{
    model::ObjectModel,
    parser::EnglishParser,
    pipeline::Done,
    plugins::{Options, PluginCatalog},
    CstNode, Next, NodeRef, Plugin, Processor, RetextError,
};

type Log = Rc<RefCell<Vec<String>>>;
type Outcome = Rc<RefCell<Vec<Result<NodeRef, RetextError>>>>;

// A parser that ignores its input and always yields "Cat."
fn cat_processor() -> Processor {
    Processor::with_parser(|_: &str| -> Result<CstNode, RetextError> {
        Ok(CstNode::parent(
            "RootNode",
            vec![CstNode::parent(
                "ParagraphNode",
                vec![CstNode::parent(
                    "SentenceNode",
                    vec![
                        CstNode::leaf("WordNode", "Cat"),
                        CstNode::leaf("PunctuationNode", "."),
                    ],
                )],
            )],
        ))
    })
}

fn logging(name: &str, log: &Log) -> Plugin {
    let log = Rc::clone(log);
    let entry = name.to_string();
    Plugin::sync(name, move |_, _| {
        log.borrow_mut().push(entry.clone());
        Ok(())
    })
}

fn collect(outcome: &Outcome) -> impl FnOnce(Result<NodeRef, RetextError>) + 'static {
    let outcome = Rc::clone(outcome);
    move |result| outcome.borrow_mut().push(result)
}

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn new_outcome() -> Outcome {
    Rc::new(RefCell::new(Vec::new()))
}

// ---
// Attachment
// ---

#[test]
fn attaching_the_same_plugin_twice_is_a_no_op() {
    let log = new_log();
    let processor = cat_processor();
    let plugin = logging("once", &log);
    processor.use_plugin(plugin.clone()).unwrap();
    processor.use_plugin(plugin).unwrap();
    assert_eq!(processor.plugin_names(), vec!["once"]);

    processor.parse("", |_| {}).unwrap();
    assert_eq!(*log.borrow(), vec!["once"]);
}

#[test]
fn attach_hook_runs_once_when_attached() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let plugin = Plugin::build("hooked")
        .on_attach(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .sync(|_, _| Ok(()));

    let processor = cat_processor();
    processor.use_plugin(plugin.clone()).unwrap();
    assert_eq!(calls.get(), 1);
    processor.use_plugin(plugin).unwrap();
    processor.parse("", |_| {}).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn attach_hook_can_attach_dependencies() {
    let log = new_log();
    let dependency = logging("dependency", &log);
    let plugin = Plugin::build("dependent")
        .on_attach(move |processor| processor.use_plugin(dependency.clone()).map(|_| ()))
        .sync(|_, _| Ok(()));

    let processor = cat_processor();
    processor.use_plugin(plugin).unwrap();
    assert_eq!(processor.plugin_names(), vec!["dependent", "dependency"]);
}

fn self_dependent(_options: &Options) -> Result<Plugin, RetextError> {
    Ok(Plugin::build("selfish")
        .on_attach(|processor| processor.use_named("selfish").map(|_| ()))
        .sync(|_, _| Ok(())))
}

#[test]
fn self_dependency_through_attach_terminates() {
    let mut catalog = PluginCatalog::standard();
    catalog.register("selfish", "attaches itself", self_dependent);
    let processor =
        Processor::with_parts(EnglishParser::new(), ObjectModel::standard(), catalog);

    processor.use_named("selfish").unwrap();
    assert_eq!(processor.plugin_names(), vec!["selfish"]);
}

#[test]
fn unknown_plugin_name_is_rejected_without_side_effects() {
    let processor = cat_processor();
    processor.use_named("uppercase").unwrap();
    let error = processor.use_named("no-such-plugin").unwrap_err();
    assert!(matches!(error, RetextError::InvalidPlugin { .. }));
    assert_eq!(processor.plugin_names(), vec!["uppercase"]);
}

#[test]
fn names_resolve_to_one_identity() {
    let processor = cat_processor();
    processor.use_named("uppercase").unwrap();
    processor.use_named("uppercase").unwrap();
    assert_eq!(processor.plugin_names(), vec!["uppercase"]);
}

// ---
// Execution order
// ---

#[test]
fn async_plugin_holds_the_pipeline_until_resumed() {
    let log = new_log();
    let pending: Rc<RefCell<Option<Next>>> = Rc::new(RefCell::new(None));

    let slot = Rc::clone(&pending);
    let waiter_log = Rc::clone(&log);
    let waiter = Plugin::asynchronous("p2", move |_, _, next| {
        waiter_log.borrow_mut().push("p2".to_string());
        *slot.borrow_mut() = Some(next);
        Ok(())
    });

    let processor = cat_processor();
    processor
        .use_plugin(logging("p1", &log))
        .unwrap()
        .use_plugin(waiter)
        .unwrap()
        .use_plugin(logging("p3", &log))
        .unwrap();

    let done_log = Rc::clone(&log);
    processor
        .parse("Cat.", move |result| {
            assert!(result.is_ok());
            done_log.borrow_mut().push("done".to_string());
        })
        .unwrap();
    assert_eq!(*log.borrow(), vec!["p1", "p2"]);

    let next = pending.borrow_mut().take().unwrap();
    assert_eq!(next.plugin(), "p2");
    next.resume();
    assert_eq!(*log.borrow(), vec!["p1", "p2", "p3", "done"]);
}

#[test]
fn long_chain_of_inline_async_plugins_runs_in_constant_stack() {
    let processor = cat_processor();
    for i in 0..10_000 {
        let plugin = Plugin::asynchronous(format!("inline-{i}"), |_, _, next| {
            next.resume();
            Ok(())
        });
        processor.use_plugin(plugin).unwrap();
    }
    let log = new_log();
    processor.use_plugin(logging("last", &log)).unwrap();

    let outcome = new_outcome();
    processor.parse("", collect(&outcome)).unwrap();

    assert_eq!(*log.borrow(), vec!["last"]);
    let results = outcome.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap().borrow().to_text(), "Cat.");
}

#[test]
fn inline_replacement_is_seen_by_the_next_plugin() {
    let swapper = Plugin::asynchronous("swap", |_, processor, next| {
        let word = processor.model().create("WordNode")?;
        word.borrow_mut().set_text("Dog")?;
        next.replace(word);
        Ok(())
    });
    let seen = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&seen);
    let reader = Plugin::sync("reader", move |tree, _| {
        *sink.borrow_mut() = tree.borrow().to_text();
        Ok(())
    });

    let processor = cat_processor();
    processor
        .use_plugin(swapper)
        .unwrap()
        .use_plugin(reader)
        .unwrap();
    let tree = processor.process("").unwrap();

    assert_eq!(*seen.borrow(), "Dog");
    assert_eq!(tree.borrow().to_text(), "Dog");
}

#[test]
fn empty_registry_completes_with_the_built_tree() {
    let outcome = new_outcome();
    cat_processor().parse("", collect(&outcome)).unwrap();
    let results = outcome.borrow();
    assert_eq!(results.len(), 1);
    let tree = results[0].as_ref().unwrap();
    assert_eq!(tree.borrow().to_text(), "Cat.");
}

#[test]
fn plugins_attached_during_a_run_wait_for_the_next_run() {
    let log = new_log();
    let late = logging("late", &log);
    let attacher = Plugin::sync("attacher", move |_, processor| {
        processor.use_plugin(late.clone()).map(|_| ())
    });

    let processor = cat_processor();
    processor.use_plugin(attacher).unwrap();
    processor.parse("", |_| {}).unwrap();
    assert!(log.borrow().is_empty());

    processor.parse("", |_| {}).unwrap();
    assert_eq!(*log.borrow(), vec!["late"]);
}

// ---
// Failure and the single callback
// ---

#[test]
fn first_error_stops_the_pipeline() {
    let log = new_log();
    let failing = Plugin::sync("p1", |_, _| Err(RetextError::plugin("p1", "boom")));
    let processor = cat_processor();
    processor
        .use_plugin(failing)
        .unwrap()
        .use_plugin(logging("p2", &log))
        .unwrap();

    let outcome = new_outcome();
    processor.parse("", collect(&outcome)).unwrap();

    assert!(log.borrow().is_empty());
    let results = outcome.borrow();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        &results[0],
        Err(RetextError::Plugin { plugin, .. }) if plugin == "p1"
    ));
}

#[test]
fn resume_then_error_fires_the_callback_once() {
    let plugin = Plugin::asynchronous("both", |_, _, next| {
        next.resume();
        Err(RetextError::plugin("both", "too late"))
    });
    let processor = cat_processor();
    processor.use_plugin(plugin).unwrap();

    let outcome = new_outcome();
    processor.parse("", collect(&outcome)).unwrap();
    let results = outcome.borrow();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
}

#[test]
fn error_then_resume_fires_the_callback_once() {
    let pending: Rc<RefCell<Option<Next>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&pending);
    let plugin = Plugin::asynchronous("both", move |_, _, next| {
        *slot.borrow_mut() = Some(next);
        Err(RetextError::plugin("both", "failed first"))
    });
    let log = new_log();
    let processor = cat_processor();
    processor
        .use_plugin(plugin)
        .unwrap()
        .use_plugin(logging("after", &log))
        .unwrap();

    let outcome = new_outcome();
    processor.parse("", collect(&outcome)).unwrap();
    let next = pending.borrow_mut().take().unwrap();
    next.resume();

    assert!(log.borrow().is_empty());
    let results = outcome.borrow();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn fail_then_error_fires_the_callback_once() {
    let plugin = Plugin::asynchronous("loud", |_, _, next| {
        next.fail(RetextError::plugin("loud", "first"));
        Err(RetextError::plugin("loud", "second"))
    });
    let processor = cat_processor();
    processor.use_plugin(plugin).unwrap();

    let outcome = new_outcome();
    processor.parse("", collect(&outcome)).unwrap();
    let results = outcome.borrow();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        &results[0],
        Err(RetextError::Plugin { message, .. }) if message == "first"
    ));
}

#[test]
fn dropped_continuation_stalls_the_pipeline() {
    let plugin = Plugin::asynchronous("sleepy", |_, _, next| {
        drop(next);
        Ok(())
    });
    let processor = cat_processor();
    processor.use_plugin(plugin).unwrap();

    let outcome = new_outcome();
    processor.parse("", collect(&outcome)).unwrap();
    assert!(outcome.borrow().is_empty());

    let error = processor.process("").unwrap_err();
    assert!(matches!(error, RetextError::Suspended { plugin } if plugin == "sleepy"));
}

// ---
// Tree replacement
// ---

#[test]
fn async_plugin_can_replace_the_tree() {
    let replacement = Rc::new(RefCell::new(None::<NodeRef>));
    let made = Rc::clone(&replacement);
    let swapper = Plugin::asynchronous("swap", move |_, processor, next| {
        let node = processor.model().create("RootNode")?;
        *made.borrow_mut() = Some(Rc::clone(&node));
        next.replace(node);
        Ok(())
    });

    let seen = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&seen);
    let reader = Plugin::sync("reader", move |tree, _| {
        *sink.borrow_mut() = tree.borrow().to_text();
        Ok(())
    });

    let processor = cat_processor();
    processor
        .use_plugin(swapper)
        .unwrap()
        .use_plugin(reader)
        .unwrap();

    let outcome = new_outcome();
    processor.parse("", collect(&outcome)).unwrap();

    assert_eq!(*seen.borrow(), "");
    let results = outcome.borrow();
    let final_tree = results[0].as_ref().unwrap();
    let expected = replacement.borrow().clone().unwrap();
    assert!(Rc::ptr_eq(final_tree, &expected));
}

// ---
// Guards and parser errors
// ---

#[test]
fn missing_callback_is_rejected_before_parsing() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let processor = Processor::with_parser(move |_: &str| -> Result<CstNode, RetextError> {
        counter.set(counter.get() + 1);
        Ok(CstNode::parent("RootNode", vec![]))
    });

    let error = processor.parse_with("Cat.", None).unwrap_err();
    assert!(matches!(error, RetextError::InvalidCallback { operation: "parse" }));
    assert_eq!(calls.get(), 0);

    let tree = processor.build("").unwrap();
    let error = processor.run_with(tree, None).unwrap_err();
    assert!(error.is_guard());
}

#[test]
fn erased_callback_is_accepted() {
    let outcome = new_outcome();
    let done: Done = Box::new(collect(&outcome));
    cat_processor().parse_with("", Some(done)).unwrap();
    assert_eq!(outcome.borrow().len(), 1);
}

#[test]
fn parser_errors_are_returned_synchronously() {
    let processor = Processor::with_parser(|text: &str| -> Result<CstNode, RetextError> {
        Err(RetextError::parse("input", text, 0usize..1, "rejected"))
    });
    let outcome = new_outcome();
    let error = processor.parse("x", collect(&outcome)).unwrap_err();
    assert!(matches!(error, RetextError::Parse { .. }));
    assert!(outcome.borrow().is_empty());
}

#[test]
fn unknown_node_types_fail_the_build() {
    let processor = Processor::with_parser(|_: &str| -> Result<CstNode, RetextError> {
        Ok(CstNode::parent("RootNode", vec![CstNode::leaf("EmojiNode", ":)")]))
    });
    let error = processor.parse("", |_| {}).unwrap_err();
    assert!(matches!(error, RetextError::UnknownNodeType { node_type } if node_type == "EmojiNode"));
}

// ---
// End to end
// ---

#[test]
fn cat_is_shouted() {
    let processor = cat_processor();
    processor.use_named("uppercase").unwrap();

    let outcome = new_outcome();
    processor.parse("whatever", collect(&outcome)).unwrap();
    let results = outcome.borrow();
    let tree = results[0].as_ref().unwrap();
    assert_eq!(tree.borrow().to_text(), "CAT.");
}

#[test]
fn run_reuses_an_existing_tree() {
    let processor = Processor::new();
    let tree = processor.build("Hello there.").unwrap();
    processor.use_named("uppercase").unwrap();

    let outcome = new_outcome();
    processor.run(Rc::clone(&tree), collect(&outcome));
    assert_eq!(outcome.borrow().len(), 1);
    assert_eq!(tree.borrow().to_text(), "HELLO THERE.");
}
