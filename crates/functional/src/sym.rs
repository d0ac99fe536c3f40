//! The `fn:` symbol table

/// `fn:list(x, ...)`: list constructor
pub const LIST: &str = "fn:list";
/// `fn:cons(x, list)`: prepend
pub const CONS: &str = "fn:cons";
/// `fn:append(list, x)`: add to tail
pub const APPEND: &str = "fn:append";
/// `fn:len(list)`: length
pub const LEN: &str = "fn:len";
/// `fn:list:get(list, i)`: element access, fails if out of range
pub const LIST_GET: &str = "fn:list:get";
/// `fn:list:contains(list, x)`: `/true` or `/false`
pub const LIST_CONTAINS: &str = "fn:list:contains";
/// `fn:pair(a, b)`: pair constructor
pub const PAIR: &str = "fn:pair";
/// `fn:tuple(x, ...)`: right-nested pairs
pub const TUPLE: &str = "fn:tuple";
/// `fn:map(k, v, ...)`: map constructor
pub const MAP: &str = "fn:map";
/// `fn:map:get(m, k)`: lookup, fails if absent
pub const MAP_GET: &str = "fn:map:get";
/// `fn:struct(k, v, ...)`: struct constructor
pub const STRUCT: &str = "fn:struct";
/// `fn:struct:get(s, k)`: field access, fails if absent
pub const STRUCT_GET: &str = "fn:struct:get";

/// `fn:plus(x, ...)`: integer sum
pub const PLUS: &str = "fn:plus";
/// `fn:minus(x)` negation, `fn:minus(x, y, ...)` subtraction
pub const MINUS: &str = "fn:minus";
/// `fn:mult(x, ...)`: integer product
pub const MULT: &str = "fn:mult";
/// `fn:div(x, y, ...)`: truncating integer division
pub const DIV: &str = "fn:div";

/// `fn:float:plus(x, ...)`: float sum
pub const FLOAT_PLUS: &str = "fn:float:plus";
/// `fn:float:mult(x, ...)`: float product
pub const FLOAT_MULT: &str = "fn:float:mult";
/// `fn:float:div(x, y, ...)`: float division
pub const FLOAT_DIV: &str = "fn:float:div";
/// `fn:sqrt(x)`: square root; negative input yields NaN
pub const SQRT: &str = "fn:sqrt";

/// `fn:number:to_string(n)`
pub const NUMBER_TO_STRING: &str = "fn:number:to_string";
/// `fn:float64:to_string(f)`
pub const FLOAT64_TO_STRING: &str = "fn:float64:to_string";
/// `fn:name:to_string(n)`
pub const NAME_TO_STRING: &str = "fn:name:to_string";
/// `fn:name:root(n)`: first segment as a name
pub const NAME_ROOT: &str = "fn:name:root";
/// `fn:name:tip(n)`: last segment as a name
pub const NAME_TIP: &str = "fn:name:tip";
/// `fn:name:list(n)`: segments as a list of names
pub const NAME_LIST: &str = "fn:name:list";
/// `fn:string:concatenate(x, ...)`: numbers and names convert implicitly
pub const STRING_CONCATENATE: &str = "fn:string:concatenate";
/// `fn:string:replace(s, from, to)`
pub const STRING_REPLACE: &str = "fn:string:replace";

/// `fn:time:now()`
pub const TIME_NOW: &str = "fn:time:now";
/// `fn:time:add(t, d)`
pub const TIME_ADD: &str = "fn:time:add";
/// `fn:time:sub(t1, t2)`: duration between instants
pub const TIME_SUB: &str = "fn:time:sub";
/// `fn:time:format(t, /precision)`: UTC
pub const TIME_FORMAT: &str = "fn:time:format";
/// `fn:time:format_civil(t, tz, /precision)`
pub const TIME_FORMAT_CIVIL: &str = "fn:time:format_civil";
/// `fn:time:parse_rfc3339(s)`
pub const TIME_PARSE_RFC3339: &str = "fn:time:parse_rfc3339";
/// `fn:time:parse_civil(s, tz)`
pub const TIME_PARSE_CIVIL: &str = "fn:time:parse_civil";
/// `fn:time:year(t)`: in the default timezone
pub const TIME_YEAR: &str = "fn:time:year";
/// `fn:time:month(t)`
pub const TIME_MONTH: &str = "fn:time:month";
/// `fn:time:day(t)`
pub const TIME_DAY: &str = "fn:time:day";
/// `fn:time:hour(t)`
pub const TIME_HOUR: &str = "fn:time:hour";
/// `fn:time:minute(t)`
pub const TIME_MINUTE: &str = "fn:time:minute";
/// `fn:time:second(t)`
pub const TIME_SECOND: &str = "fn:time:second";
/// `fn:time:to_unix_nanos(t)`
pub const TIME_TO_UNIX_NANOS: &str = "fn:time:to_unix_nanos";
/// `fn:time:from_unix_nanos(n)`
pub const TIME_FROM_UNIX_NANOS: &str = "fn:time:from_unix_nanos";
/// `fn:time:trunc(t, /unit)`: `/year` and `/month` are not supported
pub const TIME_TRUNC: &str = "fn:time:trunc";

/// `fn:duration:add(d1, d2)`
pub const DURATION_ADD: &str = "fn:duration:add";
/// `fn:duration:mult(d, n)`
pub const DURATION_MULT: &str = "fn:duration:mult";
/// `fn:duration:hours(d)`: whole hours
pub const DURATION_HOURS: &str = "fn:duration:hours";
/// `fn:duration:minutes(d)`: whole minutes
pub const DURATION_MINUTES: &str = "fn:duration:minutes";
/// `fn:duration:seconds(d)`: whole seconds
pub const DURATION_SECONDS: &str = "fn:duration:seconds";
/// `fn:duration:nanos(d)`
pub const DURATION_NANOS: &str = "fn:duration:nanos";
/// `fn:duration:from_nanos(n)`
pub const DURATION_FROM_NANOS: &str = "fn:duration:from_nanos";
/// `fn:duration:from_hours(n)`
pub const DURATION_FROM_HOURS: &str = "fn:duration:from_hours";
/// `fn:duration:from_minutes(n)`
pub const DURATION_FROM_MINUTES: &str = "fn:duration:from_minutes";
/// `fn:duration:from_seconds(n)`
pub const DURATION_FROM_SECONDS: &str = "fn:duration:from_seconds";
/// `fn:duration:parse(s)`: strict combined suffix form
pub const DURATION_PARSE: &str = "fn:duration:parse";

/// `fn:interval:start(i)`: over a pair of time instants
pub const INTERVAL_START: &str = "fn:interval:start";
/// `fn:interval:end(i)`
pub const INTERVAL_END: &str = "fn:interval:end";
/// `fn:interval:duration(i)`
pub const INTERVAL_DURATION: &str = "fn:interval:duration";

/// `do fn:group_by(v, ...)`: transform grouping directive
pub const GROUP_BY: &str = "fn:group_by";

/// `fn:collect(x, ...)`: list of values in canonical order
pub const COLLECT: &str = "fn:collect";
/// `fn:collect_distinct(x, ...)`: distinct values in canonical order
pub const COLLECT_DISTINCT: &str = "fn:collect_distinct";
/// `fn:collect_to_map(k, v)`
pub const COLLECT_TO_MAP: &str = "fn:collect_to_map";
/// `fn:count()`: number of rows
pub const COUNT: &str = "fn:count";
/// `fn:count_distinct(x, ...)`: number of distinct value tuples
pub const COUNT_DISTINCT: &str = "fn:count_distinct";
/// `fn:sum(x)`: integer sum
pub const SUM: &str = "fn:sum";
/// `fn:min(x)`
pub const MIN: &str = "fn:min";
/// `fn:max(x)`
pub const MAX: &str = "fn:max";
/// `fn:avg(x)`: float mean of integers
pub const AVG: &str = "fn:avg";
/// `fn:float:sum(x)`
pub const FLOAT_SUM: &str = "fn:float:sum";
/// `fn:float:min(x)`
pub const FLOAT_MIN: &str = "fn:float:min";
/// `fn:float:max(x)`
pub const FLOAT_MAX: &str = "fn:float:max";
/// `fn:float:avg(x)`
pub const FLOAT_AVG: &str = "fn:float:avg";

/// True for reduce operators, which only make sense inside a transform
pub fn is_reducer(name: &str) -> bool {
    matches!(
        name,
        COLLECT
            | COLLECT_DISTINCT
            | COLLECT_TO_MAP
            | COUNT
            | COUNT_DISTINCT
            | SUM
            | MIN
            | MAX
            | AVG
            | FLOAT_SUM
            | FLOAT_MIN
            | FLOAT_MAX
            | FLOAT_AVG
    )
}
