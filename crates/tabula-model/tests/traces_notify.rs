use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tabula_model::{
    CallbackError, ErrorSink, EventKind, NotifyMask, RowId, Selector, StructureEvent, Table,
    TraceEvent, TraceId, TraceMask,
};

type TraceLog = Rc<RefCell<Vec<TraceEvent>>>;
type RowLog = Rc<RefCell<Vec<StructureEvent<RowId>>>>;

fn trace_recorder(
    log: &TraceLog,
) -> impl Fn(&Table, &TraceEvent) -> Result<(), CallbackError> + 'static {
    let log = log.clone();
    move |_table: &Table, event: &TraceEvent| {
        log.borrow_mut().push(*event);
        Ok(())
    }
}

fn row_recorder(
    log: &RowLog,
) -> impl Fn(&Table, &StructureEvent<RowId>) -> Result<(), CallbackError> + 'static {
    let log = log.clone();
    move |_table: &Table, event: &StructureEvent<RowId>| {
        log.borrow_mut().push(*event);
        Ok(())
    }
}

#[test]
fn traces_fire_with_the_right_masks() {
    let table = Table::new();
    let row = table.create_row(None);
    let col = table.create_column(None);
    let log: TraceLog = Rc::default();
    table
        .add_trace(row, col, TraceMask::all(), trace_recorder(&log))
        .unwrap();

    table.set(row, col, "v1").unwrap();
    table.get(row, col).unwrap();
    table.set(row, col, "v2").unwrap();
    table.unset(row, col).unwrap();
    // reading or unsetting an absent cell fires nothing
    table.get(row, col).unwrap();
    table.unset(row, col).unwrap();

    let masks: Vec<TraceMask> = log.borrow().iter().map(|e| e.mask).collect();
    assert_eq!(
        masks,
        vec![
            TraceMask::WRITE | TraceMask::CREATE,
            TraceMask::READ,
            TraceMask::WRITE,
            TraceMask::UNSET,
        ]
    );
}

#[test]
fn tag_bound_traces_follow_membership_changes() {
    let table = Table::new();
    let rows = table.extend_rows(2);
    let col = table.create_column(None);
    let log: TraceLog = Rc::default();
    table
        .add_trace(
            Selector::tag("watched"),
            Selector::tag("all"),
            TraceMask::WRITE,
            trace_recorder(&log),
        )
        .unwrap();

    table.set(rows[0], col, 1i64).unwrap();
    assert!(log.borrow().is_empty());

    table.add_row_tag(rows[0], "watched").unwrap();
    table.set(rows[0], col, 2i64).unwrap();
    assert_eq!(log.borrow().len(), 1);

    table.remove_row_tag(rows[0], "watched").unwrap();
    table.set(rows[0], col, 3i64).unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn failing_callback_reports_but_does_not_abort() {
    struct Collecting(Rc<RefCell<Vec<String>>>);
    impl ErrorSink for Collecting {
        fn callback_failed(&self, context: &str, error: &CallbackError) {
            self.0.borrow_mut().push(format!("{context}: {error}"));
        }
    }

    let table = Table::new();
    let errors: Rc<RefCell<Vec<String>>> = Rc::default();
    table.set_error_sink(Rc::new(Collecting(errors.clone())));

    let row = table.create_row(None);
    let col = table.create_column(None);
    table
        .add_trace(row, col, TraceMask::WRITE, |_: &Table, _: &TraceEvent| {
            Err(CallbackError::new("script aborted"))
        })
        .unwrap();

    // the mutation has already committed when the callback fails
    table.set(row, col, "kept").unwrap();
    assert_eq!(table.get_text(row, col).unwrap(), Some("kept".to_string()));
    assert_eq!(errors.borrow().as_slice(), ["trace: script aborted"]);
}

#[test]
fn deleting_a_trace_mid_fire_spares_the_rest() {
    let table = Table::new();
    let row = table.create_row(None);
    let col = table.create_column(None);

    let doomed: Rc<RefCell<Option<TraceId>>> = Rc::default();
    let log: TraceLog = Rc::default();

    let doomed_ref = doomed.clone();
    table
        .add_trace(
            row,
            col,
            TraceMask::WRITE,
            move |t: &Table, _: &TraceEvent| {
                if let Some(id) = doomed_ref.borrow_mut().take() {
                    t.delete_trace(id).unwrap();
                }
                Ok(())
            },
        )
        .unwrap();
    let second = table
        .add_trace(row, col, TraceMask::WRITE, trace_recorder(&log))
        .unwrap();
    let third_log: TraceLog = Rc::default();
    table
        .add_trace(row, col, TraceMask::WRITE, trace_recorder(&third_log))
        .unwrap();
    *doomed.borrow_mut() = Some(second);

    table.set(row, col, 1i64).unwrap();
    // the deleted trace was skipped, the one after it still fired
    assert!(log.borrow().is_empty());
    assert_eq!(third_log.borrow().len(), 1);
    // double delete reports the dangling handle
    assert!(table.delete_trace(second).is_err());
}

#[test]
fn trace_callbacks_may_mutate_the_table() {
    let table = Table::new();
    let row = table.create_row(None);
    let source = table.create_column(Some("source"));
    let shadow = table.create_column(Some("shadow"));

    let handle = table.clone();
    table
        .add_trace(
            row,
            source,
            TraceMask::WRITE,
            move |_: &Table, event: &TraceEvent| {
                let copied = handle
                    .peek(event.row, event.column)
                    .map_err(|e| CallbackError::new(e.to_string()))?;
                if let Some(value) = copied {
                    handle
                        .set(event.row, shadow, value)
                        .map_err(|e| CallbackError::new(e.to_string()))?;
                }
                Ok(())
            },
        )
        .unwrap();

    table.set(row, source, "mirrored").unwrap();
    assert_eq!(
        table.get_text(row, shadow).unwrap(),
        Some("mirrored".to_string())
    );
}

#[test]
fn notifiers_see_structural_events_with_current_indices() {
    let table = Table::new();
    let log: RowLog = Rc::default();
    table
        .add_row_notifier(
            Selector::tag("all"),
            NotifyMask::ALL_EVENTS,
            false,
            row_recorder(&log),
        )
        .unwrap();

    let rows = table.extend_rows(3);
    table.set_row_label(rows[1], "renamed").unwrap();
    table.move_rows(2, 0, 1).unwrap();
    table.delete_row(rows[0]).unwrap();

    let events = log.borrow();
    let kinds: Vec<(EventKind, RowId, usize)> =
        events.iter().map(|e| (e.kind, e.id, e.index)).collect();
    assert_eq!(
        kinds,
        vec![
            (EventKind::Create, rows[0], 0),
            (EventKind::Create, rows[1], 1),
            (EventKind::Create, rows[2], 2),
            (EventKind::Relabel, rows[1], 1),
            // the moved row reports its post-move index
            (EventKind::Move, rows[2], 0),
            // deletions report the index the row held
            (EventKind::Delete, rows[0], 1),
        ]
    );
}

#[test]
fn when_idle_notifications_coalesce_per_unit_of_work() {
    let table = Table::new();
    let rows = table.extend_rows(3);
    let col = table.create_column(None);

    let log: RowLog = Rc::default();
    table
        .add_row_notifier(
            Selector::tag("all"),
            NotifyMask::MOVE,
            true,
            row_recorder(&log),
        )
        .unwrap();

    // A trace that shuffles the first row to the end and back again: two
    // MOVE events for the same row inside one unit of work.
    let handle = table.clone();
    table
        .add_trace(
            rows[0],
            col,
            TraceMask::WRITE,
            move |_: &Table, _: &TraceEvent| {
                handle
                    .move_rows(0, 3, 1)
                    .and_then(|_| handle.move_rows(2, 0, 1))
                    .map_err(|e| CallbackError::new(e.to_string()))
            },
        )
        .unwrap();

    table.set(rows[0], col, 1i64).unwrap();

    // one pending delivery per (event, row), bearing the final index
    let events = log.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Move);
    assert_eq!(events[0].id, rows[0]);
    assert_eq!(events[0].index, 0);
}

#[test]
fn deleted_notifier_stops_receiving() {
    let table = Table::new();
    let log: RowLog = Rc::default();
    let id = table
        .add_row_notifier(
            Selector::tag("all"),
            NotifyMask::CREATE,
            false,
            row_recorder(&log),
        )
        .unwrap();
    table.create_row(None);
    table.delete_notifier(id).unwrap();
    table.create_row(None);
    assert_eq!(log.borrow().len(), 1);
    assert!(table.delete_notifier(id).is_err());
}
